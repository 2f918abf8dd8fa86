// Copyright @yucwang 2026

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::error::SceneLoadError;
use crate::core::material::{Material, MaterialKind, MaterialLabel, MaterialRegistry};
use crate::core::scene::Scene;
use crate::emitters::sky::{Sky, DEFAULT_SKY_DISTANCE};
use crate::math::constants::{Float, Vector3f, PI};
use crate::math::spectrum::SpectralResponse;
use crate::renderers::state::RenderMode;
use crate::renderers::tiled::{IntegratorSettings, ShadingMode};
use crate::sensors::film::SpectralFilm;
use crate::sensors::pinhole::PinholeLens;
use crate::volumes::grid::{GridTransform, VolumeGrid};
use crate::volumes::sculpt::{fill_box, fill_sphere};

pub struct SceneLoadResult {
    pub scene: Scene,
    pub lens: PinholeLens,
    pub film: SpectralFilm,
    pub settings: IntegratorSettings,
}

pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneLoadResult, SceneLoadError> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path)?;
    log::info!("loading scene {}", path.display());
    parse_scene(&xml)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Integrator,
    Sensor,
    Film,
    Bsdf,
}

enum Primitive {
    Sphere { center: Vector3f, radius: Float, bsdf: String },
    Box { min: Vector3f, max: Vector3f, bsdf: String },
}

struct BsdfBuilder {
    id: String,
    kind: MaterialKind,
    response: SpectralResponse,
}

pub fn parse_scene(xml: &str) -> Result<SceneLoadResult, SceneLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut defaults: HashMap<String, String> = HashMap::new();
    let mut section = Section::Root;

    let mut settings = IntegratorSettings::default();
    let mut fov_deg: Float = 45.0;
    let mut jitter = true;
    let mut origin = Vector3f::new(0.0, 0.0, 3.0);
    let mut target = Vector3f::zeros();
    let mut up = Vector3f::new(0.0, 1.0, 0.0);
    let mut width: Option<usize> = None;
    let mut height: Option<usize> = None;
    let mut exposure: Float = 1.0;

    let mut grid: Option<VolumeGrid> = None;
    let mut materials = MaterialRegistry::new();
    let mut current_bsdf: Option<BsdfBuilder> = None;
    let mut primitives: Vec<Primitive> = Vec::new();
    let mut sky = Sky::default();

    loop {
        let (e, opens) = match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => (e.into_owned(), true),
            Ok(Event::Empty(e)) => (e.into_owned(), false),
            Ok(Event::End(e)) => {
                match (section, e.name().as_ref()) {
                    (Section::Integrator, b"integrator") | (Section::Sensor, b"sensor") => section = Section::Root,
                    (Section::Film, b"film") => section = Section::Sensor,
                    (Section::Bsdf, b"bsdf") => {
                        if let Some(bsdf) = current_bsdf.take() {
                            register_bsdf(&mut materials, bsdf)?;
                        }
                        section = Section::Root;
                    }
                    _ => {}
                }
                buf.clear();
                continue;
            }
            Err(e) => return Err(SceneLoadError::Parse(e.to_string())),
            _ => {
                buf.clear();
                continue;
            }
        };
        buf.clear();

        let attrs = attributes(&e, &defaults);
        match e.name().as_ref() {
            b"default" => {
                if let (Some(k), Some(v)) = (attrs.get("name"), attrs.get("value")) {
                    defaults.insert(k.clone(), v.clone());
                }
            }
            b"integrator" => {
                let kind = attrs.get("type").map(String::as_str).unwrap_or("tiled");
                if kind != "tiled" {
                    return Err(SceneLoadError::Parse(format!("unsupported integrator: {}", kind)));
                }
                if opens {
                    section = Section::Integrator;
                }
            }
            b"sensor" => {
                let kind = attrs.get("type").map(String::as_str).unwrap_or("pinhole");
                if kind != "pinhole" {
                    return Err(SceneLoadError::Parse(format!("unsupported sensor: {}", kind)));
                }
                if opens {
                    section = Section::Sensor;
                }
            }
            b"film" => {
                if section == Section::Sensor && opens {
                    section = Section::Film;
                }
            }
            b"lookat" => {
                if section == Section::Sensor {
                    origin = parse_vec3(required(&attrs, "origin")?)?;
                    target = parse_vec3(required(&attrs, "target")?)?;
                    if let Some(u) = attrs.get("up") {
                        up = parse_vec3(u)?;
                    }
                }
            }
            b"bsdf" => {
                let id = required(&attrs, "id")?.clone();
                let kind_name = attrs.get("type").map(String::as_str).unwrap_or("diffuse");
                let kind = MaterialKind::from_name(kind_name)
                    .ok_or_else(|| SceneLoadError::Parse(format!("unsupported bsdf: {}", kind_name)))?;
                let bsdf = BsdfBuilder { id, kind, response: SpectralResponse::default() };
                if opens {
                    current_bsdf = Some(bsdf);
                    section = Section::Bsdf;
                } else {
                    register_bsdf(&mut materials, bsdf)?;
                }
            }
            b"grid" => {
                let resolution = parse_u32(required(&attrs, "resolution")?)?;
                let mut transform = GridTransform::default();
                if let Some(p) = attrs.get("position") {
                    transform.pos = parse_vec3(p)?;
                }
                if let Some(s) = attrs.get("scale") {
                    transform.scale = parse_vec3(s)?;
                }
                grid = Some(VolumeGrid::new(resolution, transform)?);
            }
            b"sphere" => {
                primitives.push(Primitive::Sphere {
                    center: parse_vec3(required(&attrs, "center")?)?,
                    radius: parse_float(required(&attrs, "radius")?)?,
                    bsdf: required(&attrs, "bsdf")?.clone(),
                });
            }
            b"box" => {
                primitives.push(Primitive::Box {
                    min: parse_vec3(required(&attrs, "min")?)?,
                    max: parse_vec3(required(&attrs, "max")?)?,
                    bsdf: required(&attrs, "bsdf")?.clone(),
                });
            }
            b"sky" => {
                let distance = match attrs.get("distance") {
                    Some(d) => parse_float(d)?,
                    None => DEFAULT_SKY_DISTANCE,
                };
                let intensity = match attrs.get("intensity") {
                    Some(i) => parse_float(i)?,
                    None => 1.0,
                };
                sky = Sky::new(distance, intensity);
            }
            b"integer" | b"float" | b"string" | b"boolean" => {
                let name = required(&attrs, "name")?.as_str();
                let value = required(&attrs, "value")?.as_str();
                match section {
                    Section::Integrator => apply_integrator_param(&mut settings, name, value)?,
                    Section::Sensor => match name {
                        "fov" => fov_deg = parse_float(value)?,
                        "jitter" => jitter = parse_bool(value)?,
                        _ => log::warn!("ignoring sensor parameter {}", name),
                    },
                    Section::Film => match name {
                        "width" => width = Some(parse_usize(value)?),
                        "height" => height = Some(parse_usize(value)?),
                        "exposure" => exposure = parse_float(value)?,
                        _ => log::warn!("ignoring film parameter {}", name),
                    },
                    Section::Bsdf => {
                        if let Some(bsdf) = current_bsdf.as_mut() {
                            let r = &mut bsdf.response;
                            match name {
                                "base" => r.base = parse_float(value)?,
                                "amplitude" => r.amplitude = parse_float(value)?,
                                "peak" => r.peak = parse_float(value)?,
                                "width" => r.width = parse_float(value)?.max(1e-3),
                                _ => log::warn!("ignoring bsdf parameter {}", name),
                            }
                        }
                    }
                    Section::Root => log::warn!("parameter {} outside of any element", name),
                }
            }
            other => log::warn!("ignoring element <{}>", String::from_utf8_lossy(other)),
        }
    }

    let mut grid = grid.ok_or(SceneLoadError::MissingField("grid"))?;
    for primitive in primitives {
        let filled = match primitive {
            Primitive::Sphere { center, radius, bsdf } => {
                fill_sphere(&mut grid, center, radius, material_label(&materials, &bsdf)?)
            }
            Primitive::Box { min, max, bsdf } => {
                fill_box(&mut grid, min, max, material_label(&materials, &bsdf)?)
            }
        };
        if filled == 0 {
            log::warn!("sculpt primitive filled no cells");
        }
    }

    let width = width.ok_or(SceneLoadError::MissingField("width"))?;
    let height = height.ok_or(SceneLoadError::MissingField("height"))?;
    let lens = PinholeLens::new(origin, target, up, fov_deg * PI / 180.0, width, height).with_jitter(jitter);

    Ok(SceneLoadResult {
        scene: Scene::new(grid, materials, sky)?,
        lens,
        film: SpectralFilm::new(exposure),
        settings,
    })
}

fn attributes(e: &BytesStart<'_>, defaults: &HashMap<String, String>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = resolve_value(&attr.unescape_value().unwrap_or_default(), defaults);
        out.insert(key, value);
    }
    out
}

fn required<'a>(attrs: &'a HashMap<String, String>, key: &'static str) -> Result<&'a String, SceneLoadError> {
    attrs.get(key).ok_or(SceneLoadError::MissingField(key))
}

fn register_bsdf(materials: &mut MaterialRegistry, bsdf: BsdfBuilder) -> Result<(), SceneLoadError> {
    if materials.label_of(&bsdf.id).is_some() {
        return Err(SceneLoadError::Parse(format!("duplicate bsdf id: {}", bsdf.id)));
    }
    let material = match bsdf.kind {
        MaterialKind::Diffuse => Material::diffuse(&bsdf.id, bsdf.response),
    };
    materials
        .add(material)
        .map(|_| ())
        .ok_or_else(|| SceneLoadError::Parse(format!("too many materials at {}", bsdf.id)))
}

fn material_label(materials: &MaterialRegistry, id: &str) -> Result<MaterialLabel, SceneLoadError> {
    materials
        .label_of(id)
        .ok_or_else(|| SceneLoadError::Parse(format!("unknown bsdf reference: {}", id)))
}

fn apply_integrator_param(settings: &mut IntegratorSettings, name: &str, value: &str) -> Result<(), SceneLoadError> {
    match name {
        "edit_samples" => settings.edit_samples = parse_u32(value)?,
        "accumulate_samples" => settings.accumulate_samples = parse_u32(value)?,
        "max_depth" => settings.max_depth = parse_u32(value)?,
        "tiles_x" => settings.tiles_x = parse_usize(value)?,
        "tiles_y" => settings.tiles_y = parse_usize(value)?,
        "workers" => settings.workers = parse_usize(value)?.max(1),
        "seed" => {
            settings.seed = value
                .parse::<u64>()
                .map_err(|_| SceneLoadError::Parse(format!("invalid integer: {}", value)))?
        }
        "shading" => {
            settings.shading = ShadingMode::from_name(value)
                .ok_or_else(|| SceneLoadError::Parse(format!("unknown shading mode: {}", value)))?
        }
        "mode" => {
            settings.mode = RenderMode::from_name(value)
                .ok_or_else(|| SceneLoadError::Parse(format!("unknown render mode: {}", value)))?
        }
        "isosurface_cache" => settings.isosurface_cache = parse_bool(value)?,
        _ => log::warn!("ignoring integrator parameter {}", name),
    }
    Ok(())
}

fn resolve_value(raw: &str, defaults: &HashMap<String, String>) -> String {
    let mut out = raw.to_string();
    for (k, v) in defaults {
        out = out.replace(&format!("${}", k), v);
    }
    out
}

fn parse_float(value: &str) -> Result<Float, SceneLoadError> {
    value.parse::<Float>().map_err(|_| SceneLoadError::Parse(format!("invalid float: {}", value)))
}

fn parse_u32(value: &str) -> Result<u32, SceneLoadError> {
    value.parse::<u32>().map_err(|_| SceneLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_usize(value: &str) -> Result<usize, SceneLoadError> {
    value.parse::<usize>().map_err(|_| SceneLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_bool(value: &str) -> Result<bool, SceneLoadError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(SceneLoadError::Parse(format!("invalid boolean: {}", value))),
    }
}

fn parse_vec3(value: &str) -> Result<Vector3f, SceneLoadError> {
    let mut parts = value.split(',').map(|s| s.trim()).filter(|s| !s.is_empty());
    let x = parts.next().ok_or_else(|| SceneLoadError::Parse("invalid vec3".to_string()))?;
    let y = parts.next().ok_or_else(|| SceneLoadError::Parse("invalid vec3".to_string()))?;
    let z = parts.next().ok_or_else(|| SceneLoadError::Parse("invalid vec3".to_string()))?;
    Ok(Vector3f::new(parse_float(x)?, parse_float(y)?, parse_float(z)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RenderError;
    use crate::core::sensor::Lens;

    const SCENE: &str = r#"
<scene version="0.1">
    <default name="res" value="8"/>
    <integrator type="tiled">
        <integer name="edit_samples" value="5"/>
        <integer name="tiles_x" value="2"/>
        <integer name="tiles_y" value="2"/>
        <integer name="workers" value="2"/>
        <integer name="seed" value="99"/>
        <string name="shading" value="xor"/>
        <string name="mode" value="accumulate"/>
        <boolean name="isosurface_cache" value="false"/>
    </integrator>
    <sensor type="pinhole">
        <float name="fov" value="40"/>
        <boolean name="jitter" value="false"/>
        <lookat origin="0, 0.5, 3" target="0, 0, 0" up="0, 1, 0"/>
        <film>
            <integer name="width" value="16"/>
            <integer name="height" value="12"/>
            <float name="exposure" value="2"/>
        </film>
    </sensor>
    <bsdf type="diffuse" id="moss">
        <float name="base" value="0.1"/>
        <float name="amplitude" value="0.6"/>
        <float name="peak" value="0.45"/>
    </bsdf>
    <bsdf type="diffuse" id="stone"/>
    <grid resolution="$res" position="0, 0, 0" scale="2, 2, 2"/>
    <sphere center="0.5, 0.5, 0.5" radius="0.3" bsdf="moss"/>
    <box min="0, 0, 0" max="1, 0.1, 1" bsdf="stone"/>
    <sky distance="500" intensity="2"/>
</scene>
"#;

    #[test]
    fn parses_full_scene() {
        let loaded = parse_scene(SCENE).unwrap();
        let s = &loaded.settings;
        assert_eq!(s.edit_samples, 5);
        assert_eq!(s.accumulate_samples, 256);
        assert_eq!((s.tiles_x, s.tiles_y, s.workers, s.seed), (2, 2, 2, 99));
        assert_eq!(s.shading, ShadingMode::Xor);
        assert_eq!(s.mode, RenderMode::Accumulate);
        assert!(!s.isosurface_cache);

        assert_eq!((loaded.lens.width(), loaded.lens.height()), (16, 12));
        assert!((loaded.lens.origin() - Vector3f::new(0.0, 0.5, 3.0)).norm() < 1e-6);
        assert!((loaded.film.exposure() - 2.0).abs() < 1e-6);

        let scene = &loaded.scene;
        assert_eq!(scene.grid().resolution(), 8);
        assert_eq!(scene.materials().len(), 2);
        let moss = scene.materials().get(1).unwrap();
        assert_eq!(moss.name(), "moss");
        assert!((moss.response().amplitude - 0.6).abs() < 1e-6);
        assert!(scene.grid().occupied_count() > 64);
        assert_eq!(scene.grid().material_label([3, 0, 3]), Some(2));
        assert_eq!(scene.sky().distance(), 500.0);
        assert_eq!(scene.sky().intensity(), 2.0);
    }

    #[test]
    fn missing_grid_is_reported() {
        let xml = r#"<scene><sensor type="pinhole"><film>
            <integer name="width" value="4"/><integer name="height" value="4"/>
        </film></sensor></scene>"#;
        assert!(matches!(parse_scene(xml), Err(SceneLoadError::MissingField("grid"))));
    }

    #[test]
    fn unknown_bsdf_reference_fails() {
        let xml = r#"<scene><grid resolution="4"/>
            <sphere center="0.5,0.5,0.5" radius="0.2" bsdf="glass"/>
            <sensor type="pinhole"><film>
                <integer name="width" value="4"/><integer name="height" value="4"/>
            </film></sensor></scene>"#;
        assert!(matches!(parse_scene(xml), Err(SceneLoadError::Parse(_))));
    }

    #[test]
    fn invalid_grid_surfaces_render_error() {
        let xml = r#"<scene><grid resolution="4096"/></scene>"#;
        assert!(matches!(parse_scene(xml), Err(SceneLoadError::Render(RenderError::InvalidGrid(_)))));
    }

    #[test]
    fn rejects_unknown_shading() {
        let xml = r#"<scene><integrator type="tiled"><string name="shading" value="plasma"/></integrator></scene>"#;
        assert!(matches!(parse_scene(xml), Err(SceneLoadError::Parse(_))));
    }
}

/* Copyright 2020 @Yuchen Wong */

use crate::na;

pub type Float = f32;
pub type Int = i32;
pub type UInt = u32;

pub type Vector2f = na::Vector2<Float>;
pub type Vector3f = na::Vector3<Float>;

pub const EPSILON: Float = 1e-4;
pub const PI: Float = 3.14159265359;
pub const INV_PI: Float = 0.31830988618;
pub const SQUARE_2: Float = 1.41421356;
pub const INV_SQUARE_2: Float = 0.70710678;
pub const SQUARE_3: Float = 1.73205081;

pub const FLOAT_MAX: Float = std::f32::MAX;
pub const FLOAT_MIN: Float = std::f32::MIN;

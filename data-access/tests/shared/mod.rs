#![allow(dead_code)]

pub mod faulty;
pub mod fixture;
pub mod setup;

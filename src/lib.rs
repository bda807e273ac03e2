//! # Rover Drive Library
//!
//! Drive a six-wheeled, four-steered rover with a gamepad.
//!
//! This library provides the motion-control kinematics (stick mixing and
//! Ackermann steering), the gamepad input layer, the motor backends and the
//! control loop that ties them together.

pub mod actuator;
pub mod config;
pub mod control;
pub mod controller;
pub mod drive;
pub mod error;
pub mod supervisor;

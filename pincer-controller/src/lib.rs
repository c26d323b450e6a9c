#![doc = include_str!("../../doc_include.md")]

pub mod arm_config;
pub mod arm_controller;
pub mod arm_driver;
pub mod arm_state;
pub mod command;
pub mod kinematics;

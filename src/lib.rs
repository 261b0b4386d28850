//! Product configurator core.
//!
//! A catalog of products, an event bus, and the switch controller that loads
//! a product's mesh, centers it, attaches it to the scene and adjusts camera
//! and lighting. Rendering is modelled as data; there is no window.

pub mod app;
pub mod assets;
pub mod catalog;
pub mod events;
pub mod render;
pub mod scene;
pub mod ui;

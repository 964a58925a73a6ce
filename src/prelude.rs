//! A collection of types and traits which when imported make working
//! with the template cache ergonomic and easy.
//!
//! We recommend you import these whenever you work with mustash
//! primitives:
//!
//! ```
//! use mustash::prelude::*;
//! ```
pub use crate::config::Config;
pub use crate::engine::{Engine, Template};
pub use crate::error::Error;
pub use crate::index::{TemplateIndex, TemplateRecord};
pub use crate::logging::Logger;

pub use serde::{Deserialize, Serialize};
pub use tokio;

//! Global error type.
//!
//! Every failure the render path can produce funnels through [`Error`],
//! so a render call returns exactly one rendered string or exactly one
//! error, never both and never neither.
use crate::index::CompileFailure;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(#[from] crate::config::Error),

    #[error("{0}")]
    Pattern(#[from] glob::PatternError),

    /// The template's source failed to compile. Raised when the broken
    /// template is used, not when it is scanned.
    #[error("{0}")]
    Compile(CompileFailure),

    /// The template compiled but failed during evaluation, e.g. a partial
    /// it references is not in the index.
    #[error("{0}")]
    Render(#[from] handlebars::RenderError),

    #[error("template \"{0}\" does not exist")]
    TemplateMissing(String),
}

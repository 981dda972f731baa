// core/src/lib.rs

//! Step pipelines for the MediaHub backend.
//!
//! A workflow (sign-in, booking creation, status change, review upsert, ...) is
//! expressed as a `Pipeline<TData, Err>`: an ordered list of named steps, each
//! with `before`/`on`/`after` handlers that operate on a shared
//! `ContextData<TData>`. Handlers return `PipelineControl::Continue` to move on
//! or `PipelineControl::Stop` to end the run early without an error.
//!
//! Pipelines are registered once at startup in a `Flows<E>` registry keyed by
//! the context type, so a web handler only has to build the context and call
//! `flows.run(ctx)`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Flows;

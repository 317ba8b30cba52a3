//! Application use cases (business logic orchestration).

mod execute_request;
mod load_settings;
mod variable_scopes;

pub use execute_request::{
    ExecuteRequestPipeline, ExecutePipelineError, ExecutionTarget, PipelineOutcome,
};
pub use load_settings::{LoadSettings, SETTINGS_KEY};
pub use variable_scopes::{
    COLLECTION_KEY, FlushVariableScopes, GLOBAL_KEY, LoadVariableScopes, SwitchEnvironment,
    environment_key,
};

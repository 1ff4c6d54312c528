// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;
pub type Result<T> = std::result::Result<T, StackError>;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid placement for {resource}: {reason}")]
    InvalidPlacement { resource: String, reason: String },

    #[error("Address space exhausted: {0}")]
    CidrExhausted(String),

    #[error("Duplicate logical id '{logical_id}' in stack '{stack}'")]
    DuplicateLogicalId { stack: String, logical_id: String },

    #[error("Stack already declared: {0}")]
    DuplicateStack(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Unresolved reference in stack '{stack}': '{from}' refers to undeclared '{target}'")]
    UnresolvedReference {
        stack: String,
        from: String,
        target: String,
    },

    #[error("Unknown attribute '{attribute}' of {resource_type} '{target}' in stack '{stack}'")]
    UnknownAttribute {
        stack: String,
        target: String,
        resource_type: String,
        attribute: String,
    },

    #[error("Parameter '{parameter}' in stack '{stack}' redeclared with a different type or default")]
    ConflictingParameter { stack: String, parameter: String },

    #[error("Unknown template parameter '{parameter}' in stack '{stack}'")]
    UnknownParameter { stack: String, parameter: String },

    #[error("Dependency cycle in stack '{stack}' involving: {}", members.join(", "))]
    DependencyCycle { stack: String, members: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StackError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn invalid_placement(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPlacement {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn unresolved(
        stack: impl Into<String>,
        from: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::UnresolvedReference {
            stack: stack.into(),
            from: from.into(),
            target: target.into(),
        }
    }
}

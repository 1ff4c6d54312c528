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

use super::compute::ScalingTrigger;
use super::token::Value;
use crate::shared::error::{Result, StackError};
use std::collections::BTreeMap;

/// Fargate cpu units and the memory sizes each one allows.
const FARGATE_SIZES: &[(u32, u32, u32)] = &[
    (256, 512, 2048),
    (512, 1024, 4096),
    (1024, 2048, 8192),
    (2048, 4096, 16384),
    (4096, 8192, 30720),
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterProps {
    pub cluster_name: Option<String>,
    pub container_insights: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheck {
    pub path: String,
    pub healthy_http_codes: String,
    pub interval_seconds: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            healthy_http_codes: "200".to_string(),
            interval_seconds: 30,
            healthy_threshold: 5,
            unhealthy_threshold: 2,
        }
    }
}

/// Task-count scaling of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskScaling {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub triggers: Vec<ScalingTrigger>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadBalancedServiceProps {
    pub image: String,
    pub container_name: String,
    pub container_port: u16,
    pub cpu: u32,
    pub memory_mib: u32,
    pub desired_count: u32,
    pub public_load_balancer: bool,
    /// Container environment; values may be tokens resolved at deploy time.
    pub environment: BTreeMap<String, Value>,
    pub health_check: HealthCheck,
    pub scaling: Option<TaskScaling>,
}

impl LoadBalancedServiceProps {
    pub fn validate(&self) -> Result<()> {
        let size_ok = FARGATE_SIZES
            .iter()
            .any(|(cpu, lo, hi)| *cpu == self.cpu && self.memory_mib >= *lo && self.memory_mib <= *hi);
        if !size_ok {
            return Err(StackError::config_error(format!(
                "Unsupported task size: cpu {} with memory {} MiB",
                self.cpu, self.memory_mib
            )));
        }

        if self.image.trim().is_empty() {
            return Err(StackError::config_error("service image must not be empty"));
        }

        if let Some(scaling) = &self.scaling {
            if scaling.min_capacity > self.desired_count || self.desired_count > scaling.max_capacity
            {
                return Err(StackError::ValidationError(format!(
                    "service capacity must satisfy min <= desired <= max, got {} <= {} <= {}",
                    scaling.min_capacity, self.desired_count, scaling.max_capacity
                )));
            }
            for trigger in &scaling.triggers {
                trigger.validate()?;
            }
        }

        Ok(())
    }
}

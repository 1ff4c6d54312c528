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

use super::network::SubnetTier;
use crate::shared::error::{Result, StackError};
use serde::{Deserialize, Serialize};

/// Instance families the provider lists as previous generation.
const PREVIOUS_GENERATION_FAMILIES: &[&str] = &["t1", "t2", "m1", "m3", "m4", "c1", "c3", "c4", "r3", "r4"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType(String);

impl InstanceType {
    pub fn new(name: &str) -> Result<Self> {
        match name.split_once('.') {
            Some((family, size)) if !family.is_empty() && !size.is_empty() => {
                Ok(Self(name.to_string()))
            }
            _ => Err(StackError::config_error(format!(
                "Invalid instance type '{}': expected <family>.<size>",
                name
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    pub fn is_previous_generation(&self) -> bool {
        is_previous_generation_family(self.family())
    }
}

pub(crate) fn is_previous_generation_family(family: &str) -> bool {
    PREVIOUS_GENERATION_FAMILIES.contains(&family)
}

/// Machine images resolved by the engine from public parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineImage {
    AmazonLinux2,
    EcsOptimizedAmazonLinux2,
}

impl MachineImage {
    pub fn parameter_path(&self) -> &'static str {
        match self {
            MachineImage::AmazonLinux2 => {
                "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2"
            }
            MachineImage::EcsOptimizedAmazonLinux2 => {
                "/aws/service/ecs/optimized-ami/amazon-linux-2/recommended/image_id"
            }
        }
    }

    /// Name of the template parameter carrying the image id.
    pub fn parameter_name(&self) -> &'static str {
        match self {
            MachineImage::AmazonLinux2 => "SsmParameterValueAmazonLinux2ImageId",
            MachineImage::EcsOptimizedAmazonLinux2 => "SsmParameterValueEcsOptimizedAmazonLinux2ImageId",
        }
    }
}

/// Size bounds of a scaling pool; `min <= desired <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityBounds {
    min: u32,
    desired: u32,
    max: u32,
}

impl CapacityBounds {
    pub fn new(min: u32, desired: u32, max: u32) -> Result<Self> {
        if max == 0 {
            return Err(StackError::ValidationError(
                "max capacity must be > 0".to_string(),
            ));
        }
        if min > desired || desired > max {
            return Err(StackError::ValidationError(format!(
                "capacity must satisfy min <= desired <= max, got {} <= {} <= {}",
                min, desired, max
            )));
        }
        Ok(Self { min, desired, max })
    }

    pub fn fixed(count: u32) -> Result<Self> {
        Self::new(count, count, count)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn desired(&self) -> u32 {
        self.desired
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }
}

/// Utilization target that drives a target-tracking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingTrigger {
    Cpu { target_percent: u8 },
    Memory { target_percent: u8 },
}

impl ScalingTrigger {
    pub fn target_percent(&self) -> u8 {
        match self {
            ScalingTrigger::Cpu { target_percent } | ScalingTrigger::Memory { target_percent } => {
                *target_percent
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScalingTrigger::Cpu { .. } => "Cpu",
            ScalingTrigger::Memory { .. } => "Memory",
        }
    }

    pub fn validate(&self) -> Result<()> {
        let pct = self.target_percent();
        if pct == 0 || pct > 100 {
            return Err(StackError::ValidationError(format!(
                "{} scaling target must be within 1..=100, got {}",
                self.name(),
                pct
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoScalingGroupProps {
    /// Workload role, carried as the `Role` tag.
    pub role: String,
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    pub capacity: CapacityBounds,
    pub subnet_tier: SubnetTier,
    pub triggers: Vec<ScalingTrigger>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_bounds_ordering() {
        assert!(CapacityBounds::new(2, 2, 8).is_ok());
        assert!(CapacityBounds::new(1, 3, 10).is_ok());
        assert!(CapacityBounds::new(3, 2, 8).is_err());
        assert!(CapacityBounds::new(1, 9, 8).is_err());
        assert!(CapacityBounds::new(0, 0, 0).is_err());
        assert!(CapacityBounds::fixed(2).unwrap().is_fixed());
    }

    #[test]
    fn test_previous_generation_families() {
        assert!(InstanceType::new("t2.medium").unwrap().is_previous_generation());
        assert!(InstanceType::new("r4.large").unwrap().is_previous_generation());
        assert!(!InstanceType::new("m5.2xlarge").unwrap().is_previous_generation());
        assert!(InstanceType::new("large").is_err());
    }

    #[test]
    fn test_trigger_percent_range() {
        assert!(ScalingTrigger::Cpu { target_percent: 70 }.validate().is_ok());
        assert!(ScalingTrigger::Memory { target_percent: 0 }.validate().is_err());
        assert!(ScalingTrigger::Memory { target_percent: 101 }.validate().is_err());
    }
}

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

//! Resource descriptors and the typed props constructs are declared with

pub mod compute;
pub mod container;
pub mod database;
pub mod network;
pub mod resource;
pub mod security;
pub mod token;

pub use self::compute::{
    AutoScalingGroupProps, CapacityBounds, InstanceType, MachineImage, ScalingTrigger,
};
pub use self::container::{ClusterProps, HealthCheck, LoadBalancedServiceProps, TaskScaling};
pub use self::database::{DatabaseEngine, DatabaseInstanceProps, LicenseModel, StorageBounds};
pub use self::network::{plan_subnets, SubnetConfiguration, SubnetPlan, SubnetTier, VpcProps};
pub use self::resource::{CfnOutput, CfnParameter, CfnResource, RemovalPolicy};
pub use self::security::{IngressRule, Peer, Port, SecurityGroupProps};
pub use self::token::{tags, LogicalId, Props, Pseudo, Token, Value};

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

//! Constructs that expand typed props into resource descriptors

pub mod auto_scaling;
pub mod cluster;
pub mod database;
pub mod iam;
pub mod security_group;
pub mod service;
pub mod vpc;

pub use self::auto_scaling::{AutoScalingGroupBuilder, AutoScalingGroupHandle};
pub use self::cluster::{ClusterBuilder, ClusterHandle};
pub use self::database::{DatabaseBuilder, DatabaseHandle};
pub use self::security_group::{IngressRuleBuilder, SecurityGroupBuilder};
pub use self::service::{LoadBalancedServiceBuilder, LoadBalancedServiceHandle};
pub use self::vpc::{SubnetHandle, VpcBuilder, VpcHandle};

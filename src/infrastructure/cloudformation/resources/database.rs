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

use super::vpc::VpcHandle;
use crate::domain::model::{
    CfnResource, DatabaseInstanceProps, LogicalId, Props, SubnetTier, Token, Value,
};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::{DB_STORAGE_TYPE, TYPE_DB_INSTANCE, TYPE_DB_SUBNET_GROUP};
use crate::shared::error::{Result, StackError};

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseHandle {
    pub instance: LogicalId,
    pub subnet_group: LogicalId,
    pub security_groups: Vec<LogicalId>,
    pub port: u16,
}

impl DatabaseHandle {
    pub fn endpoint_address(&self) -> Token {
        Token::get_att(&self.instance, "Endpoint.Address")
    }

    pub fn endpoint_port(&self) -> Token {
        Token::get_att(&self.instance, "Endpoint.Port")
    }
}

pub struct DatabaseBuilder {
    id: String,
    props: DatabaseInstanceProps,
    vpc: VpcHandle,
    security_groups: Vec<LogicalId>,
}

impl DatabaseBuilder {
    pub fn new(
        id: &str,
        props: DatabaseInstanceProps,
        vpc: &VpcHandle,
        security_groups: Vec<LogicalId>,
    ) -> Self {
        Self {
            id: id.to_string(),
            props,
            vpc: vpc.clone(),
            security_groups,
        }
    }

    pub fn build(&self, stack: &mut Stack) -> Result<DatabaseHandle> {
        self.props.validate()?;

        if self.props.subnet_tier != SubnetTier::Isolated {
            return Err(StackError::invalid_placement(
                &self.id,
                format!(
                    "database instances must be placed in isolated subnets, not {}",
                    self.props.subnet_tier.as_str()
                ),
            ));
        }
        let subnet_ids = self.vpc.subnet_refs(self.props.subnet_tier, &self.id)?;

        let instance_id = LogicalId::new(&self.id);
        let subnet_group = stack.add_resource(CfnResource::new(
            instance_id.child("SubnetGroup"),
            TYPE_DB_SUBNET_GROUP,
            Props::new()
                .with(
                    "DBSubnetGroupDescription",
                    format!("Subnet group for {} database", self.id),
                )
                .with("SubnetIds", subnet_ids),
        ))?;

        let security_groups: Vec<Value> = self
            .security_groups
            .iter()
            .map(|sg| Token::get_att(sg, "GroupId").into())
            .collect();

        let engine = &self.props.engine;
        let props = Props::new()
            .with("Engine", engine.engine_name())
            .with("EngineVersion", engine.version())
            .with("DBInstanceClass", self.props.instance_class.as_str())
            .with("AllocatedStorage", self.props.storage.allocated_gib().to_string())
            .with("MaxAllocatedStorage", self.props.storage.max_allocated_gib())
            .with("StorageType", DB_STORAGE_TYPE)
            .with("MultiAZ", self.props.multi_az)
            .with("DeletionProtection", self.props.deletion_protection)
            .with("PubliclyAccessible", false)
            .with("DBSubnetGroupName", Token::reference(&subnet_group))
            .with("VPCSecurityGroups", security_groups)
            .with("LicenseModel", self.props.license().as_str())
            .with("MasterUsername", engine.default_master_username())
            .with("ManageMasterUserPassword", true)
            .with("BackupRetentionPeriod", self.props.backup_retention_days)
            .with("CopyTagsToSnapshot", true)
            .with("Port", self.props.port().to_string());

        let instance = stack.add_resource(
            CfnResource::new(instance_id, TYPE_DB_INSTANCE, props)
                .with_removal_policy(self.props.removal_policy),
        )?;

        tracing::debug!(
            database = %instance,
            engine = engine.engine_name(),
            multi_az = self.props.multi_az,
            "database instance declared"
        );

        Ok(DatabaseHandle {
            instance,
            subnet_group,
            security_groups: self.security_groups.clone(),
            port: self.props.port(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        DatabaseEngine, RemovalPolicy, StorageBounds, SubnetConfiguration, VpcProps,
    };
    use crate::domain::stack::Environment;
    use crate::infrastructure::cloudformation::resources::VpcBuilder;

    fn setup() -> (Stack, VpcHandle) {
        let mut stack = Stack::new("Db", Environment::new(None, "us-east-1")).unwrap();
        let vpc = VpcBuilder::new(
            "Vpc",
            VpcProps {
                cidr: "10.0.0.0/16".parse().unwrap(),
                max_azs: 2,
                nat_gateways: 1,
                subnets: vec![
                    SubnetConfiguration::new("Public", SubnetTier::Public, 24),
                    SubnetConfiguration::new("Database", SubnetTier::Isolated, 24),
                ],
            },
        )
        .build(&mut stack)
        .unwrap();
        (stack, vpc)
    }

    fn props(tier: SubnetTier) -> DatabaseInstanceProps {
        DatabaseInstanceProps {
            engine: DatabaseEngine::Postgres("15.4".to_string()),
            instance_class: "db.t3.micro".to_string(),
            storage: StorageBounds::new(20, 100).unwrap(),
            subnet_tier: tier,
            multi_az: false,
            deletion_protection: false,
            removal_policy: RemovalPolicy::Delete,
            backup_retention_days: 1,
        }
    }

    #[test]
    fn test_database_in_isolated_tier() {
        let (mut stack, vpc) = setup();
        let db = DatabaseBuilder::new("Database", props(SubnetTier::Isolated), &vpc, vec![])
            .build(&mut stack)
            .unwrap();

        let instance = stack.resource(&db.instance).unwrap();
        assert_eq!(instance.property("AllocatedStorage").and_then(|v| v.as_int()), Some(20));
        assert_eq!(instance.property("MaxAllocatedStorage").and_then(|v| v.as_int()), Some(100));
        assert_eq!(instance.removal_policy, Some(RemovalPolicy::Delete));
        assert_eq!(db.port, 5432);
        assert_eq!(
            instance.property("LicenseModel").and_then(|v| v.as_str()),
            Some("postgresql-license")
        );

        let group = stack.resource(&db.subnet_group).unwrap();
        let ids = group.property("SubnetIds").unwrap().as_list().unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_database_outside_isolated_tier_rejected() {
        let (mut stack, vpc) = setup();
        let err = DatabaseBuilder::new("Database", props(SubnetTier::Public), &vpc, vec![])
            .build(&mut stack)
            .unwrap_err();
        assert!(matches!(err, StackError::InvalidPlacement { .. }));
    }
}

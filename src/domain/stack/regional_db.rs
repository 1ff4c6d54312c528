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

use super::{App, Environment, Stack};
use crate::domain::config::RegionalDatabaseConf;
use crate::domain::model::{CfnOutput, LogicalId, SecurityGroupProps};
use crate::infrastructure::cloudformation::resources::{
    DatabaseBuilder, DatabaseHandle, SecurityGroupBuilder, VpcBuilder, VpcHandle,
};
use crate::shared::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionalDatabaseStack {
    pub stack_name: String,
    pub vpc: VpcHandle,
    pub security_group: LogicalId,
    pub database: DatabaseHandle,
}

/// Isolated network plus one database; nothing inside the stack opens a
/// path to it.
pub fn build_regional_database_stack(
    app: &mut App,
    conf: &RegionalDatabaseConf,
) -> Result<RegionalDatabaseStack> {
    let env = Environment::new(conf.account.clone(), conf.region.as_str());
    let mut stack = Stack::new(&conf.stack_name, env)?.with_description(conf.description.as_str());

    let vpc = VpcBuilder::new("Vpc", conf.network.to_props()).build(&mut stack)?;

    let security_group = SecurityGroupBuilder::new(
        "DatabaseSecurityGroup",
        &vpc.vpc,
        SecurityGroupProps::restricted("Regional database, no ingress"),
    )
    .build(&mut stack)?;

    let database = DatabaseBuilder::new(
        "Database",
        conf.database.to_props()?,
        &vpc,
        vec![security_group.clone()],
    )
    .build(&mut stack)?;

    stack.add_output(
        CfnOutput::new("DatabaseEndpoint", database.endpoint_address())
            .description("Database endpoint address"),
    )?;
    stack.add_output(CfnOutput::new("VpcId", vpc.vpc_ref()).description("Network ID"))?;

    let handle = RegionalDatabaseStack {
        stack_name: conf.stack_name.clone(),
        vpc,
        security_group,
        database,
    };
    app.add_stack(stack)?;
    Ok(handle)
}

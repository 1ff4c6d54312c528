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

use crate::domain::model::{CfnResource, LogicalId, Props, Pseudo, Token, Value};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::TYPE_IAM_ROLE;
use crate::shared::error::Result;

fn assume_role_policy(principal: &str) -> Value {
    let statement = Props::new()
        .with("Action", "sts:AssumeRole")
        .with("Effect", "Allow")
        .with("Principal", Props::new().with("Service", principal));
    Props::new()
        .with("Statement", vec![Value::from(statement)])
        .with("Version", "2012-10-17")
        .into()
}

/// `arn:<partition>:iam::aws:policy/<name>`
pub fn managed_policy_arn(name: &str) -> Value {
    Token::join(
        "",
        vec![
            "arn:".into(),
            Token::Pseudo(Pseudo::Partition).into(),
            format!(":iam::aws:policy/{}", name).into(),
        ],
    )
    .into()
}

/// Declares a role assumable by `principal` with the given managed policies.
pub fn declare_service_role(
    stack: &mut Stack,
    id: LogicalId,
    principal: &str,
    managed_policies: &[&str],
) -> Result<LogicalId> {
    let mut props = Props::new().with("AssumeRolePolicyDocument", assume_role_policy(principal));
    if !managed_policies.is_empty() {
        let arns: Vec<Value> = managed_policies.iter().map(|p| managed_policy_arn(p)).collect();
        props.insert("ManagedPolicyArns", arns);
    }
    stack.add_resource(CfnResource::new(id, TYPE_IAM_ROLE, props))
}

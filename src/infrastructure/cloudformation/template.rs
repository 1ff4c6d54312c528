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

use super::resolver::{check_references, creation_order, dependency_edges, Edge};
use crate::domain::model::{CfnOutput, CfnParameter, CfnResource, LogicalId, Token, Value};
use crate::domain::stack::Stack;
use crate::infrastructure::constants::TEMPLATE_FORMAT_VERSION;
use crate::shared::error::{Result, StackError};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }
}

impl std::str::FromStr for TemplateFormat {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(StackError::config_error(format!(
                "Invalid template format: {}",
                other
            ))),
        }
    }
}

/// Resolved template of one stack.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedStack {
    pub stack_name: String,
    pub region: String,
    pub account: Option<String>,
    pub template: Json,
    /// Creation order, dependencies first.
    pub order: Vec<LogicalId>,
    pub edges: BTreeSet<Edge>,
    pub outputs: Vec<String>,
}

impl SynthesizedStack {
    pub fn resource_count(&self) -> usize {
        self.order.len()
    }

    /// Dependencies of `id` inside this template.
    pub fn dependencies_of(&self, id: &LogicalId) -> Vec<&LogicalId> {
        self.edges
            .iter()
            .filter(|(from, _)| from == id)
            .map(|(_, to)| to)
            .collect()
    }

    pub fn render(&self, format: TemplateFormat) -> Result<String> {
        match format {
            TemplateFormat::Json => Ok(serde_json::to_string_pretty(&self.template)?),
            TemplateFormat::Yaml => Ok(serde_yaml::to_string(&self.template)?),
        }
    }

    pub fn template_file_name(&self, format: TemplateFormat) -> String {
        format!("{}.template.{}", self.stack_name, format.extension())
    }
}

/// Checks references, orders resources and emits the template.
pub fn synthesize(stack: &Stack) -> Result<SynthesizedStack> {
    check_references(stack)?;
    let edges = dependency_edges(stack.resources());
    let order = creation_order(stack, &edges)?;

    let mut template = Map::new();
    template.insert("AWSTemplateFormatVersion".to_string(), json!(TEMPLATE_FORMAT_VERSION));
    if let Some(description) = stack.description() {
        template.insert("Description".to_string(), json!(description));
    }

    if !stack.parameters().is_empty() {
        let parameters: Map<String, Json> = stack
            .parameters()
            .values()
            .map(|p| (p.name.clone(), render_parameter(p)))
            .collect();
        template.insert("Parameters".to_string(), Json::Object(parameters));
    }

    let resources: Map<String, Json> = stack
        .resources()
        .iter()
        .map(|r| (r.logical_id.to_string(), render_resource(r)))
        .collect();
    template.insert("Resources".to_string(), Json::Object(resources));

    if !stack.outputs().is_empty() {
        let outputs: Map<String, Json> = stack
            .outputs()
            .iter()
            .map(|o| (o.name.clone(), render_output(o)))
            .collect();
        template.insert("Outputs".to_string(), Json::Object(outputs));
    }

    tracing::info!(
        stack = %stack.name(),
        resources = order.len(),
        edges = edges.len(),
        "stack synthesized"
    );

    Ok(SynthesizedStack {
        stack_name: stack.name().to_string(),
        region: stack.env().region.clone(),
        account: stack.env().account.clone(),
        template: Json::Object(template),
        order,
        edges,
        outputs: stack.outputs().iter().map(|o| o.name.clone()).collect(),
    })
}

fn render_parameter(parameter: &CfnParameter) -> Json {
    let mut body = Map::new();
    body.insert("Type".to_string(), json!(parameter.parameter_type));
    if let Some(default) = &parameter.default {
        body.insert("Default".to_string(), json!(default));
    }
    if let Some(description) = &parameter.description {
        body.insert("Description".to_string(), json!(description));
    }
    Json::Object(body)
}

fn render_resource(resource: &CfnResource) -> Json {
    let mut body = Map::new();
    body.insert("Type".to_string(), json!(resource.resource_type));
    if !resource.properties.is_empty() {
        let properties: Map<String, Json> = resource
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), render_value(v)))
            .collect();
        body.insert("Properties".to_string(), Json::Object(properties));
    }
    if !resource.depends_on.is_empty() {
        let mut depends: Vec<&str> = resource.depends_on.iter().map(|d| d.as_str()).collect();
        depends.sort_unstable();
        body.insert("DependsOn".to_string(), json!(depends));
    }
    if let Some(policy) = resource.removal_policy {
        body.insert("DeletionPolicy".to_string(), json!(policy.as_str()));
        body.insert("UpdateReplacePolicy".to_string(), json!(policy.as_str()));
    }
    Json::Object(body)
}

fn render_output(output: &CfnOutput) -> Json {
    let mut body = Map::new();
    body.insert("Value".to_string(), render_value(&output.value));
    if let Some(description) = &output.description {
        body.insert("Description".to_string(), json!(description));
    }
    if let Some(export) = &output.export_name {
        body.insert("Export".to_string(), json!({ "Name": export }));
    }
    Json::Object(body)
}

/// Turns a property value into its template form, tokens becoming intrinsics.
pub fn render_value(value: &Value) -> Json {
    match value {
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Str(s) => json!(s),
        Value::List(items) => Json::Array(items.iter().map(render_value).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v)))
                .collect(),
        ),
        Value::Token(token) => render_token(token),
    }
}

fn render_token(token: &Token) -> Json {
    match token {
        Token::Ref(target) => json!({ "Ref": target.as_str() }),
        Token::GetAtt { target, attribute } => {
            json!({ "Fn::GetAtt": [target.as_str(), attribute] })
        }
        Token::Parameter(name) => json!({ "Ref": name }),
        Token::Pseudo(pseudo) => json!({ "Ref": pseudo.as_str() }),
        Token::Join { delimiter, parts } => {
            let parts: Vec<Json> = parts.iter().map(render_value).collect();
            json!({ "Fn::Join": [delimiter, parts] })
        }
        Token::Base64(inner) => json!({ "Fn::Base64": render_value(inner) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Props, Pseudo, RemovalPolicy};
    use crate::domain::stack::Environment;

    #[test]
    fn test_tokens_become_intrinsics() {
        let db = LogicalId::new("Database");
        let value = Value::from(Token::join(
            ":",
            vec![
                Token::get_att(&db, "Endpoint.Address").into(),
                Token::Pseudo(Pseudo::Region).into(),
            ],
        ));
        assert_eq!(
            render_value(&value),
            json!({ "Fn::Join": [":", [
                { "Fn::GetAtt": ["Database", "Endpoint.Address"] },
                { "Ref": "AWS::Region" }
            ]] })
        );
    }

    #[test]
    fn test_template_sections() {
        let mut stack = Stack::new("Tpl", Environment::new(None, "us-east-1"))
            .unwrap()
            .with_description("demo");
        let vpc = stack
            .add_resource(
                CfnResource::new(LogicalId::new("Vpc"), "AWS::EC2::VPC", Props::new())
                    .with_removal_policy(RemovalPolicy::Retain),
            )
            .unwrap();
        stack
            .add_output(CfnOutput::new("VpcId", Token::reference(&vpc)).export("Tpl-VpcId"))
            .unwrap();

        let synthesized = synthesize(&stack).unwrap();
        let template = &synthesized.template;
        assert_eq!(template["Description"], json!("demo"));
        assert_eq!(template["Resources"]["Vpc"]["DeletionPolicy"], json!("Retain"));
        assert_eq!(template["Outputs"]["VpcId"]["Export"]["Name"], json!("Tpl-VpcId"));
        assert!(template.get("Parameters").is_none());
        assert_eq!(synthesized.template_file_name(TemplateFormat::Yaml), "Tpl.template.yaml");

        let yaml = synthesized.render(TemplateFormat::Yaml).unwrap();
        assert!(yaml.contains("AWSTemplateFormatVersion"));
    }
}

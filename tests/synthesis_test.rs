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

#[cfg(test)]
mod tests {
    use infra_stacks::domain::model::{CfnResource, LogicalId, Props, Token};
    use infra_stacks::domain::stack::Environment;
    use infra_stacks::*;

    fn synthesize_all(app: &App) -> Vec<SynthesizedStack> {
        app.stacks().iter().map(|s| synthesize(s).unwrap()).collect()
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let first = App::from_conf(&AppConf::default()).unwrap();
        let second = App::from_conf(&AppConf::default()).unwrap();

        let a = synthesize_all(&first);
        let b = synthesize_all(&second);
        assert_eq!(a, b);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(
                x.render(TemplateFormat::Json).unwrap(),
                y.render(TemplateFormat::Json).unwrap()
            );
            assert_eq!(
                x.render(TemplateFormat::Yaml).unwrap(),
                y.render(TemplateFormat::Yaml).unwrap()
            );
        }
    }

    #[test]
    fn test_creation_order_respects_dependencies() {
        let app = App::from_conf(&AppConf::default()).unwrap();
        for synthesized in synthesize_all(&app) {
            assert_eq!(synthesized.order.len(), synthesized.resource_count());
            let position = |id: &LogicalId| synthesized.order.iter().position(|o| o == id).unwrap();
            for (from, to) in &synthesized.edges {
                assert!(position(to) < position(from), "{} before {}", to, from);
            }
        }
    }

    #[test]
    fn test_primary_template_outputs() {
        let app = App::from_conf(&AppConf::default()).unwrap();
        let stack = app.stack("PrimaryApplicationStack").unwrap();
        let synthesized = synthesize(stack).unwrap();
        let outputs = &synthesized.template["Outputs"];

        assert_eq!(
            outputs["LoadBalancerDns"]["Value"]["Fn::GetAtt"][1],
            serde_json::json!("DNSName")
        );
        assert_eq!(
            outputs["VpcId"]["Export"]["Name"],
            serde_json::json!("PrimaryApplicationStack-VpcId")
        );
        assert!(outputs.get("DatabaseEndpoint").is_some());
    }

    #[test]
    fn test_dangling_reference_fails() {
        let conf = AppConf::default();
        let mut app = App::new();
        let primary = build_primary_stack(&mut app, &conf.primary).unwrap();
        let stack = app.stack_mut(&primary.stack_name).unwrap();
        stack.remove(&primary.database.subnet_group).unwrap();

        let err = synthesize(stack).unwrap_err();
        assert!(matches!(err, StackError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_cycle_fails() {
        let mut stack = Stack::new("Cyclic", Environment::new(None, "us-east-1")).unwrap();
        let a = LogicalId::new("A");
        let b = LogicalId::new("B");
        stack
            .add_resource(CfnResource::new(
                a.clone(),
                "AWS::EC2::VPC",
                Props::new().with("Peer", Token::reference(&b)),
            ))
            .unwrap();
        stack
            .add_resource(CfnResource::new(b, "AWS::EC2::VPC", Props::new()).depends_on(&a))
            .unwrap();

        let err = synthesize(&stack).unwrap_err();
        match err {
            StackError::DependencyCycle { members, .. } => assert_eq!(members, vec!["A", "B"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_fs_assembly_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::from_conf(&AppConf::default()).unwrap();
        let stacks = synthesize_all(&app);
        let writer = FsAssemblyWriter::new(dir.path());

        writer.write(&stacks, TemplateFormat::Json).await.unwrap();
        let first = std::fs::read(dir.path().join("PrimaryApplicationStack.template.json")).unwrap();
        let manifest_first = std::fs::read(dir.path().join("manifest.json")).unwrap();

        let manifest = writer.write(&stacks, TemplateFormat::Json).await.unwrap();
        let second = std::fs::read(dir.path().join("PrimaryApplicationStack.template.json")).unwrap();
        let manifest_second = std::fs::read(dir.path().join("manifest.json")).unwrap();

        assert_eq!(first, second);
        assert_eq!(manifest_first, manifest_second);
        assert_eq!(manifest.stacks.len(), 2);
        assert_eq!(
            manifest.stack("RegionalDatabaseStack").map(|e| e.region.as_str()),
            Some("me-south-1")
        );
    }

    #[tokio::test]
    async fn test_memory_writer_matches_fs_layout() {
        let app = App::from_conf(&AppConf::default()).unwrap();
        let stacks = synthesize_all(&app);
        let writer = MemoryAssemblyWriter::new();
        writer.write(&stacks, TemplateFormat::Yaml).await.unwrap();

        assert_eq!(
            writer.file_names().await,
            vec![
                "PrimaryApplicationStack.template.yaml",
                "RegionalDatabaseStack.template.yaml",
                "manifest.json"
            ]
        );
    }
}

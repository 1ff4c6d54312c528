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
    use infra_stacks::domain::model::SubnetTier;
    use infra_stacks::domain::stack::IngressSource;
    use infra_stacks::infrastructure::constants::{
        TYPE_AUTO_SCALING_GROUP, TYPE_DB_INSTANCE, TYPE_ROUTE, TYPE_SCALABLE_TARGET,
    };
    use infra_stacks::*;

    fn build_app() -> (App, PrimaryStack, RegionalDatabaseStack) {
        let conf = AppConf::default();
        let mut app = App::new();
        let primary = build_primary_stack(&mut app, &conf.primary).unwrap();
        let regional =
            build_regional_database_stack(&mut app, &conf.regional_database).unwrap();
        (app, primary, regional)
    }

    fn int(stack: &Stack, id: &infra_stacks::domain::model::LogicalId, key: &str) -> i64 {
        stack
            .resource(id)
            .and_then(|r| r.property(key))
            .and_then(|v| v.as_int())
            .unwrap_or_else(|| panic!("{} has no integer {}", id, key))
    }

    #[test]
    fn test_database_reachable_only_from_service() {
        let (app, primary, _) = build_app();
        let stack = app.stack(&primary.stack_name).unwrap();
        let reach = Reachability::new(stack);
        let db_sg = &primary.database_security_group;
        let port = primary.database.port;

        assert_eq!(port, 5432);
        assert!(reach.can_reach(&primary.service.service_security_group, db_sg, port));
        assert_eq!(
            reach.ingress_sources(db_sg, port),
            vec![IngressSource::Group(
                primary.service.service_security_group.clone()
            )]
        );
        assert!(!reach.can_reach(&primary.service.load_balancer_security_group, db_sg, port));
        for pool in &primary.pools {
            assert!(!reach.can_reach(&pool.security_group, db_sg, port));
        }
        assert!(!reach.publicly_reachable(db_sg, port));
        for subnet in primary.vpc.subnets_in(SubnetTier::Public) {
            assert!(!reach.reachable_from_cidr(&subnet.cidr, db_sg, port));
        }
    }

    #[test]
    fn test_removing_ingress_rule_cuts_access() {
        let (mut app, primary, _) = build_app();
        let stack = app.stack_mut(&primary.stack_name).unwrap();
        assert!(stack.remove(&primary.database_ingress).is_some());

        let reach = Reachability::new(stack);
        assert!(reach
            .ingress_sources(&primary.database_security_group, primary.database.port)
            .is_empty());
        assert!(synthesize(stack).is_ok());
    }

    #[test]
    fn test_load_balancer_is_public() {
        let (app, primary, _) = build_app();
        let stack = app.stack(&primary.stack_name).unwrap();
        let reach = Reachability::new(stack);
        assert!(reach.publicly_reachable(&primary.service.load_balancer_security_group, 80));
        assert!(!reach.publicly_reachable(&primary.service.service_security_group, 80));
    }

    #[test]
    fn test_capacity_ordering() {
        let (app, primary, _) = build_app();
        let stack = app.stack(&primary.stack_name).unwrap();

        let groups: Vec<_> = stack.resources_of_type(TYPE_AUTO_SCALING_GROUP).collect();
        assert_eq!(groups.len(), 6);
        for group in groups {
            let min = int(stack, &group.logical_id, "MinSize");
            let desired = int(stack, &group.logical_id, "DesiredCapacity");
            let max = int(stack, &group.logical_id, "MaxSize");
            assert!(min <= desired && desired <= max && max > 0, "{}", group.logical_id);
        }

        let targets: Vec<_> = stack.resources_of_type(TYPE_SCALABLE_TARGET).collect();
        assert_eq!(targets.len(), 1);
        let min = int(stack, &targets[0].logical_id, "MinCapacity");
        let max = int(stack, &targets[0].logical_id, "MaxCapacity");
        let desired = int(stack, &primary.service.service, "DesiredCount");
        assert_eq!((min, desired, max), (2, 2, 10));
    }

    #[test]
    fn test_storage_bounds() {
        let (app, primary, regional) = build_app();
        let bounds = |stack_name: &str| {
            let stack = app.stack(stack_name).unwrap();
            let db = stack.resources_of_type(TYPE_DB_INSTANCE).next().unwrap();
            (
                int(stack, &db.logical_id, "AllocatedStorage"),
                int(stack, &db.logical_id, "MaxAllocatedStorage"),
            )
        };
        assert_eq!(bounds(&primary.stack_name), (20, 100));
        assert_eq!(bounds(&regional.stack_name), (200, 1000));
    }

    #[test]
    fn test_regional_database_multi_az_in_isolated_subnets() {
        let (app, _, regional) = build_app();
        let stack = app.stack(&regional.stack_name).unwrap();
        assert_eq!(stack.env().region, "me-south-1");

        let db = stack.resource(&regional.database.instance).unwrap();
        assert_eq!(db.property("MultiAZ").and_then(|v| v.as_bool()), Some(true));

        let group = stack.resource(&regional.database.subnet_group).unwrap();
        let referenced = group.referenced_ids();
        assert_eq!(referenced.len(), 2);
        for id in referenced {
            let subnet = regional.vpc.subnets.iter().find(|s| &s.subnet == id).unwrap();
            assert_eq!(subnet.tier, SubnetTier::Isolated);
        }
    }

    #[test]
    fn test_subnets_never_overlap() {
        let (_, primary, regional) = build_app();
        for vpc in [&primary.vpc, &regional.vpc] {
            for (i, a) in vpc.subnets.iter().enumerate() {
                assert!(vpc.cidr.contains(&a.cidr));
                for b in &vpc.subnets[i + 1..] {
                    assert!(
                        !a.cidr.contains(&b.cidr.network()) && !b.cidr.contains(&a.cidr.network()),
                        "{} overlaps {}",
                        a.cidr,
                        b.cidr
                    );
                }
            }
        }
    }

    #[test]
    fn test_isolated_route_tables_have_no_routes() {
        let (app, primary, regional) = build_app();
        for (name, vpc) in [
            (&primary.stack_name, &primary.vpc),
            (&regional.stack_name, &regional.vpc),
        ] {
            let stack = app.stack(name).unwrap();
            for subnet in vpc.subnets_in(SubnetTier::Isolated) {
                let routes = stack
                    .resources_of_type(TYPE_ROUTE)
                    .filter(|r| r.referenced_ids().contains(&&subnet.route_table))
                    .count();
                assert_eq!(routes, 0, "{}", subnet.route_table);
            }
        }
    }

    #[test]
    fn test_validator_accepts_default_stacks() {
        let (app, _, _) = build_app();
        let validator = StackValidator::new();
        for stack in app.stacks() {
            let report = validator.validate(stack);
            assert!(!report.has_errors(), "{:?}", report.findings);
        }
    }

    #[test]
    fn test_app_from_conf_declares_both_stacks() {
        let app = App::from_conf(&AppConf::default()).unwrap();
        let names: Vec<&str> = app.stacks().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["PrimaryApplicationStack", "RegionalDatabaseStack"]);
        assert!(App::from_conf(&AppConf::default())
            .unwrap()
            .select(&["Missing".to_string()])
            .is_err());
    }

    #[test]
    fn test_zone_count_beyond_region_suffixes_is_rejected() {
        let mut conf = AppConf::default();
        conf.primary.network.max_azs = 8;
        let err = build_primary_stack(&mut App::new(), &conf.primary).unwrap_err();
        assert!(matches!(err, StackError::ConfigError(_)));

        let mut conf = AppConf::default();
        let overrides = infra_stacks::domain::config::parse_dynamic_configs(&[
            "primary.max-azs=8".to_string(),
        ])
        .unwrap();
        infra_stacks::domain::config::apply_to_app_conf(&overrides, &mut conf).unwrap();
        assert!(App::from_conf(&conf).is_err());
    }
}

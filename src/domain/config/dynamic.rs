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

use super::app::AppConf;
use crate::shared::error::{Result, StackError};
use ipnet::Ipv4Net;
use std::collections::HashMap;
use std::str::FromStr;

/// Keys understood by [`apply_to_app_conf`].
pub const SUPPORTED_KEYS: &[&str] = &[
    "primary.region",
    "primary.account",
    "primary.vpc-cidr",
    "primary.max-azs",
    "primary.nat-gateways",
    "primary.service.image",
    "primary.service.desired-count",
    "primary.database.allocated-storage",
    "primary.database.max-allocated-storage",
    "regional.region",
    "regional.account",
    "regional.vpc-cidr",
    "regional.database.instance-class",
    "regional.database.allocated-storage",
    "regional.database.max-allocated-storage",
    "regional.database.multi-az",
    "stack.description",
];

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        StackError::config_error(format!("Invalid value '{}' for {}: {}", value, key, e))
    })
}

/// Applies `-D key=value` overrides on top of the loaded configuration.
/// Unknown keys and unparsable values are errors, and on error `conf` is
/// left untouched.
pub fn apply_to_app_conf(configs: &HashMap<String, String>, conf: &mut AppConf) -> Result<()> {
    if let Some(key) = configs.keys().find(|k| !SUPPORTED_KEYS.contains(&k.as_str())) {
        return Err(StackError::config_error(format!(
            "Unknown dynamic property '{}'. Supported: {}",
            key,
            SUPPORTED_KEYS.join(", ")
        )));
    }

    let mut staged = conf.clone();
    apply_overrides(configs, &mut staged)?;
    *conf = staged;
    Ok(())
}

fn apply_overrides(configs: &HashMap<String, String>, conf: &mut AppConf) -> Result<()> {
    let primary = &mut conf.primary;
    if let Some(region) = configs.get("primary.region") {
        primary.region = region.clone();
    }

    if let Some(account) = configs.get("primary.account") {
        primary.account = Some(account.clone());
    }

    if let Some(cidr) = configs.get("primary.vpc-cidr") {
        primary.network.cidr = parse::<Ipv4Net>("primary.vpc-cidr", cidr)?;
    }

    if let Some(azs) = configs.get("primary.max-azs") {
        primary.network.max_azs = parse("primary.max-azs", azs)?;
    }

    if let Some(nat) = configs.get("primary.nat-gateways") {
        primary.network.nat_gateways = parse("primary.nat-gateways", nat)?;
    }

    if let Some(image) = configs.get("primary.service.image") {
        primary.service.image = image.clone();
    }

    if let Some(count) = configs.get("primary.service.desired-count") {
        primary.service.desired_count = parse("primary.service.desired-count", count)?;
    }

    if let Some(size) = configs.get("primary.database.allocated-storage") {
        primary.database.allocated_storage = parse("primary.database.allocated-storage", size)?;
    }

    if let Some(size) = configs.get("primary.database.max-allocated-storage") {
        primary.database.max_allocated_storage =
            parse("primary.database.max-allocated-storage", size)?;
    }

    let regional = &mut conf.regional_database;
    if let Some(region) = configs.get("regional.region") {
        regional.region = region.clone();
    }

    if let Some(account) = configs.get("regional.account") {
        regional.account = Some(account.clone());
    }

    if let Some(cidr) = configs.get("regional.vpc-cidr") {
        regional.network.cidr = parse::<Ipv4Net>("regional.vpc-cidr", cidr)?;
    }

    if let Some(class) = configs.get("regional.database.instance-class") {
        regional.database.instance_class = class.clone();
    }

    if let Some(size) = configs.get("regional.database.allocated-storage") {
        regional.database.allocated_storage = parse("regional.database.allocated-storage", size)?;
    }

    if let Some(size) = configs.get("regional.database.max-allocated-storage") {
        regional.database.max_allocated_storage =
            parse("regional.database.max-allocated-storage", size)?;
    }

    if let Some(flag) = configs.get("regional.database.multi-az") {
        regional.database.multi_az = parse("regional.database.multi-az", flag)?;
    }

    // Applies to both stacks
    if let Some(description) = configs.get("stack.description") {
        conf.primary.description = description.clone();
        conf.regional_database.description = description.clone();
    }

    Ok(())
}

/// Parse dynamic configuration properties from -D key=value format
pub fn parse_dynamic_configs(configs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for config in configs {
        let (key, value) = config.split_once('=').ok_or_else(|| {
            StackError::config_error(format!(
                "Invalid config format: '{}'. Expected 'key=value'",
                config
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(StackError::config_error(format!(
                "Empty key in config: '{}'",
                config
            )));
        }

        map.insert(key.to_string(), value.trim().to_string());
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs(pairs: &[&str]) -> HashMap<String, String> {
        let owned: Vec<String> = pairs.iter().map(|s| s.to_string()).collect();
        parse_dynamic_configs(&owned).unwrap()
    }

    #[test]
    fn test_overrides_applied() {
        let mut conf = AppConf::default();
        apply_to_app_conf(
            &configs(&[
                "primary.region=eu-central-1",
                "primary.service.desired-count=4",
                "regional.database.multi-az=false",
                "regional.vpc-cidr=10.30.0.0/16",
                "stack.description=staging",
            ]),
            &mut conf,
        )
        .unwrap();

        assert_eq!(conf.primary.region, "eu-central-1");
        assert_eq!(conf.primary.service.desired_count, 4);
        assert!(!conf.regional_database.database.multi_az);
        assert_eq!(conf.regional_database.network.cidr.to_string(), "10.30.0.0/16");
        assert_eq!(conf.regional_database.description, "staging");
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let mut conf = AppConf::default();
        let err = apply_to_app_conf(&configs(&["primary.max-azs=two"]), &mut conf).unwrap_err();
        assert!(matches!(err, StackError::ConfigError(_)));
        assert_eq!(conf.primary.network.max_azs, 2);
    }

    #[test]
    fn test_failed_override_leaves_conf_unchanged() {
        let mut conf = AppConf::default();
        let err = apply_to_app_conf(
            &configs(&[
                "primary.region=eu-west-1",
                "primary.service.image=nginx:1.27",
                "regional.region=eu-south-1",
                "regional.database.multi-az=sometimes",
            ]),
            &mut conf,
        )
        .unwrap_err();

        assert!(matches!(err, StackError::ConfigError(_)));
        assert_eq!(conf, AppConf::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut conf = AppConf::default();
        assert!(apply_to_app_conf(&configs(&["primary.color=blue"]), &mut conf).is_err());
    }

    #[test]
    fn test_parse_dynamic_configs() {
        let parsed = configs(&["primary.service.image = nginx:1.27"]);
        assert_eq!(parsed.get("primary.service.image").map(String::as_str), Some("nginx:1.27"));
        assert!(parse_dynamic_configs(&["novalue".to_string()]).is_err());
        assert!(parse_dynamic_configs(&["=x".to_string()]).is_err());
    }
}

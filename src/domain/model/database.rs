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
use super::resource::RemovalPolicy;
use crate::shared::error::{Result, StackError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "engine", content = "version", rename_all = "kebab-case")]
pub enum DatabaseEngine {
    Postgres(String),
    Mysql(String),
    SqlserverSe(String),
}

impl DatabaseEngine {
    pub fn from_name(name: &str, version: &str) -> Result<Self> {
        let version = version.to_string();
        match name {
            "postgres" => Ok(DatabaseEngine::Postgres(version)),
            "mysql" => Ok(DatabaseEngine::Mysql(version)),
            "sqlserver-se" => Ok(DatabaseEngine::SqlserverSe(version)),
            other => Err(StackError::config_error(format!(
                "Unsupported database engine: {}",
                other
            ))),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres(_) => "postgres",
            DatabaseEngine::Mysql(_) => "mysql",
            DatabaseEngine::SqlserverSe(_) => "sqlserver-se",
        }
    }

    pub fn version(&self) -> &str {
        match self {
            DatabaseEngine::Postgres(v) | DatabaseEngine::Mysql(v) | DatabaseEngine::SqlserverSe(v) => v,
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseEngine::Postgres(_) => 5432,
            DatabaseEngine::Mysql(_) => 3306,
            DatabaseEngine::SqlserverSe(_) => 1433,
        }
    }

    pub fn default_license(&self) -> LicenseModel {
        match self {
            DatabaseEngine::Postgres(_) => LicenseModel::PostgresqlLicense,
            DatabaseEngine::Mysql(_) => LicenseModel::GeneralPublicLicense,
            DatabaseEngine::SqlserverSe(_) => LicenseModel::LicenseIncluded,
        }
    }

    pub fn default_master_username(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres(_) => "postgres",
            DatabaseEngine::Mysql(_) | DatabaseEngine::SqlserverSe(_) => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseModel {
    LicenseIncluded,
    GeneralPublicLicense,
    PostgresqlLicense,
}

impl LicenseModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseModel::LicenseIncluded => "license-included",
            LicenseModel::GeneralPublicLicense => "general-public-license",
            LicenseModel::PostgresqlLicense => "postgresql-license",
        }
    }
}

/// Storage in GiB; autoscaling may grow `allocated` up to `max_allocated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBounds {
    allocated_gib: u32,
    max_allocated_gib: u32,
}

impl StorageBounds {
    pub fn new(allocated_gib: u32, max_allocated_gib: u32) -> Result<Self> {
        if allocated_gib == 0 {
            return Err(StackError::ValidationError(
                "allocated storage must be > 0".to_string(),
            ));
        }
        if allocated_gib > max_allocated_gib {
            return Err(StackError::ValidationError(format!(
                "allocated storage ({} GiB) exceeds max allocated storage ({} GiB)",
                allocated_gib, max_allocated_gib
            )));
        }
        Ok(Self {
            allocated_gib,
            max_allocated_gib,
        })
    }

    pub fn allocated_gib(&self) -> u32 {
        self.allocated_gib
    }

    pub fn max_allocated_gib(&self) -> u32 {
        self.max_allocated_gib
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseInstanceProps {
    pub engine: DatabaseEngine,
    /// e.g. `db.t3.micro`
    pub instance_class: String,
    pub storage: StorageBounds,
    pub subnet_tier: SubnetTier,
    pub multi_az: bool,
    pub deletion_protection: bool,
    pub removal_policy: RemovalPolicy,
    pub backup_retention_days: u32,
}

impl DatabaseInstanceProps {
    pub fn port(&self) -> u16 {
        self.engine.default_port()
    }

    /// Each supported engine has exactly one license model on the provider.
    pub fn license(&self) -> LicenseModel {
        self.engine.default_license()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.instance_class.starts_with("db.") {
            return Err(StackError::config_error(format!(
                "Invalid database instance class '{}': expected db.<family>.<size>",
                self.instance_class
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_bounds() {
        assert!(StorageBounds::new(20, 100).is_ok());
        assert!(StorageBounds::new(200, 1000).is_ok());
        assert!(StorageBounds::new(100, 100).is_ok());
        assert!(StorageBounds::new(101, 100).is_err());
        assert!(StorageBounds::new(0, 100).is_err());
    }

    #[test]
    fn test_engine_defaults() {
        let sql = DatabaseEngine::SqlserverSe("15.00".to_string());
        assert_eq!(sql.engine_name(), "sqlserver-se");
        assert_eq!(sql.default_port(), 1433);
        assert_eq!(sql.default_license(), LicenseModel::LicenseIncluded);
        assert_eq!(DatabaseEngine::from_name("sqlserver-se", "15.00").unwrap(), sql);
        assert!(DatabaseEngine::from_name("oracle-ee", "19").is_err());

        let pg = DatabaseEngine::Postgres("15.4".to_string());
        assert_eq!(pg.default_port(), 5432);
        assert_eq!(pg.version(), "15.4");
        assert_eq!(pg.default_license().as_str(), "postgresql-license");
        assert_eq!(
            DatabaseEngine::Mysql("8.0".to_string()).default_license(),
            LicenseModel::GeneralPublicLicense
        );
    }
}

// targetry-core/src/domain/target/athena.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fields::{self, CommonFields, Extra, de};
use super::{FromProfile, ResolveContext, Source, TargetCommon, TargetDescriptor, expect_tag};
use crate::domain::backend::Backend;
use crate::domain::connection::{AthenaConnectionConfig, ConnectionConfig};
use crate::domain::error::ConfigError;
use crate::domain::incremental::IncrementalKind;
use crate::domain::raw::RawTarget;

#[derive(Debug, Deserialize)]
struct AthenaProfile {
    #[serde(default, deserialize_with = "de::text")]
    database: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    schema: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    s3_staging_dir: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    s3_data_dir: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    work_group: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    region_name: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    aws_access_key_id: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    aws_secret_access_key: Option<String>,
    #[serde(flatten)]
    inert: AthenaInert,
    #[serde(flatten)]
    common: CommonFields,
    #[serde(flatten)]
    extra: Extra,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AthenaInert {
    #[serde(default, deserialize_with = "de::text")]
    s3_data_naming: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    s3_tmp_table_dir: Option<String>,
    #[serde(default, deserialize_with = "de::int_opt")]
    poll_interval: Option<u64>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    debug_query_state: Option<bool>,
    #[serde(default, deserialize_with = "de::flag_opt")]
    skip_workgroup_check: Option<bool>,
    #[serde(default, deserialize_with = "de::text")]
    spark_work_group: Option<String>,
    #[serde(default, deserialize_with = "de::text")]
    aws_profile_name: Option<String>,
    #[serde(default, deserialize_with = "de::int_opt")]
    num_retries: Option<u64>,
    #[serde(default, deserialize_with = "de::int_opt")]
    num_boto3_retries: Option<u64>,
    #[serde(default, deserialize_with = "de::int_opt")]
    num_iceberg_retries: Option<u64>,
    #[serde(default, deserialize_with = "de::string_map")]
    seed_s3_upload_args: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "de::string_map")]
    lf_tags_database: Option<BTreeMap<String, String>>,
}

/// Analytical engine over object storage.
#[derive(Debug, Clone, PartialEq)]
pub struct AthenaTarget {
    common: TargetCommon,
    s3_staging_dir: Option<String>,
    s3_data_dir: Option<String>,
    work_group: Option<String>,
    region_name: Option<String>,
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
}

impl FromProfile for AthenaTarget {
    fn from_raw(raw: &RawTarget, _ctx: &ResolveContext<'_>) -> Result<Self, ConfigError> {
        expect_tag(raw, &["athena"])?;
        let profile: AthenaProfile = fields::parse(raw, &[])?;

        let database = fields::required_text(profile.database, &["database"])?;
        let schema = fields::required_text(profile.schema, &["schema"])?;

        let inert = fields::present_keys(&profile.inert);
        let mut common = TargetCommon::new(profile.common, database, schema, 4, Source::Profile)?;
        common.seal(inert, profile.extra);

        Ok(Self {
            common,
            s3_staging_dir: profile.s3_staging_dir,
            s3_data_dir: profile.s3_data_dir,
            work_group: profile.work_group,
            region_name: profile.region_name,
            aws_access_key_id: profile.aws_access_key_id,
            aws_secret_access_key: profile.aws_secret_access_key,
        })
    }
}

impl TargetDescriptor for AthenaTarget {
    fn backend(&self) -> Backend {
        Backend::Athena
    }

    fn common(&self) -> &TargetCommon {
        &self.common
    }

    fn default_incremental_strategy(&self, _kind: IncrementalKind) -> &'static str {
        "insert_overwrite"
    }

    fn to_connection(&self) -> ConnectionConfig {
        ConnectionConfig::Athena(AthenaConnectionConfig {
            aws_access_key_id: self.aws_access_key_id.clone(),
            aws_secret_access_key: self.aws_secret_access_key.clone(),
            region_name: self.region_name.clone(),
            work_group: self.work_group.clone(),
            s3_staging_dir: self.s3_staging_dir.clone(),
            s3_warehouse_location: self.s3_data_dir.clone(),
            schema_name: self.common.schema().to_string(),
            catalog_name: self.common.database().to_string(),
            concurrent_tasks: self.common.threads(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::test_support::build;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_connection() -> anyhow::Result<()> {
        let target: AthenaTarget = build(
            "type: athena\nname: dev\ndatabase: awsdatacatalog\nschema: lake\nregion_name: eu-west-1\ns3_staging_dir: s3://results/\ns3_data_dir: s3://tables/\nnum_retries: 2\nlf_tags_database:\n  team: data",
        )?;
        assert_eq!(
            target.to_connection(),
            ConnectionConfig::Athena(AthenaConnectionConfig {
                aws_access_key_id: None,
                aws_secret_access_key: None,
                region_name: Some("eu-west-1".into()),
                work_group: None,
                s3_staging_dir: Some("s3://results/".into()),
                s3_warehouse_location: Some("s3://tables/".into()),
                schema_name: "lake".into(),
                catalog_name: "awsdatacatalog".into(),
                concurrent_tasks: 4,
            })
        );
        assert_eq!(target.common().inert_fields().len(), 2);
        Ok(())
    }

    #[test]
    fn test_inert_counts_must_be_integers() {
        let err = build::<AthenaTarget>("type: athena\nname: dev\ndatabase: c\nschema: s\npoll_interval: soon")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldType { ref field, .. } if field == "poll_interval"));
    }

    #[test]
    fn test_strategy() -> anyhow::Result<()> {
        let target: AthenaTarget = build("type: athena\nname: dev\ndatabase: c\nschema: s\nthreads: 2")?;
        assert_eq!(target.common().threads(), 2);
        assert_eq!(target.default_incremental_strategy(IncrementalKind::TimeRange), "insert_overwrite");
        Ok(())
    }
}

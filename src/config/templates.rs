//! Service template seeding from config.toml
//!
//! The `[[templates]]` tables in config.toml describe the service templates every fresh
//! installation starts with. Templates that already exist for the seed owner (matched by
//! name) are left alone, so editing a seeded template in the app is never overwritten.

use crate::core::template::{self, TemplateStepInput, TemplateUpdate};
use crate::entities::{ServiceTemplate, service_template};
use crate::errors::{Error, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the template section of config.toml
#[derive(Debug, Default, Deserialize)]
pub struct TemplatesConfig {
    /// Templates to seed
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

/// Configuration for a single service template
#[derive(Debug, Deserialize, Clone)]
pub struct TemplateConfig {
    /// Service name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Flat service fee
    #[serde(default)]
    pub base_charge: f64,
    /// Default steps, in order
    #[serde(default)]
    pub steps: Vec<TemplateStepConfig>,
}

/// Configuration for one default step
#[derive(Debug, Deserialize, Clone)]
pub struct TemplateStepConfig {
    /// Step label
    pub label: String,
    /// Optional details
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the step is normally outsourced
    #[serde(default)]
    pub is_outsource: bool,
    /// Amount quoted for the step
    #[serde(default)]
    pub charge: f64,
}

impl From<TemplateStepConfig> for TemplateStepInput {
    fn from(step: TemplateStepConfig) -> Self {
        Self {
            label: step.label,
            description: step.description,
            is_outsource: step.is_outsource,
            charge: step.charge,
        }
    }
}

/// Loads template configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_templates<P: AsRef<Path>>(path: P) -> Result<TemplatesConfig> {
    let path_ref = path.as_ref();
    debug!("Loading templates from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Like [`load_templates`], but a missing file yields an empty configuration.
pub fn load_templates_if_present<P: AsRef<Path>>(path: P) -> Result<TemplatesConfig> {
    if path.as_ref().exists() {
        load_templates(path)
    } else {
        info!(
            "No template config at {}, skipping seeding",
            path.as_ref().display()
        );
        Ok(TemplatesConfig::default())
    }
}

/// Creates every configured template the owner does not have yet.
///
/// Returns the number of templates created.
pub async fn seed_templates(
    db: &DatabaseConnection,
    owner_id: &str,
    config: &TemplatesConfig,
) -> Result<usize> {
    let mut created = 0;

    for entry in &config.templates {
        let existing = ServiceTemplate::find()
            .filter(service_template::Column::OwnerId.eq(owner_id))
            .filter(service_template::Column::Name.eq(entry.name.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            debug!("Template {} already present", entry.name);
            continue;
        }

        let template = template::create_template(
            db,
            owner_id,
            entry.name.clone(),
            entry.description.clone(),
            entry.base_charge,
        )
        .await?;

        template::update_template(
            db,
            owner_id,
            template.id,
            TemplateUpdate {
                name: entry.name.clone(),
                description: entry.description.clone(),
                base_charge: entry.base_charge,
                steps: entry.steps.iter().cloned().map(Into::into).collect(),
            },
        )
        .await?;

        created += 1;
    }

    info!("Seeded {} service templates", created);
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::setup_test_db;

    const SAMPLE: &str = r#"
        [[templates]]
        name = "Golden Visa"
        description = "Ten-year residency"
        base_charge = 1500.0

        [[templates.steps]]
        label = "Collect documents"

        [[templates.steps]]
        label = "Medical test"
        is_outsource = true
        charge = 350.0

        [[templates]]
        name = "Trade Licence Renewal"
    "#;

    #[test]
    fn test_parse_template_config() {
        let config: TemplatesConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.templates.len(), 2);
        assert_eq!(config.templates[0].name, "Golden Visa");
        assert_eq!(config.templates[0].base_charge, 1500.0);
        assert_eq!(config.templates[0].steps.len(), 2);
        assert!(config.templates[0].steps[1].is_outsource);
        assert_eq!(config.templates[0].steps[1].charge, 350.0);
        assert!(config.templates[1].steps.is_empty());
        assert_eq!(config.templates[1].base_charge, 0.0);
    }

    #[test]
    fn test_missing_file_is_empty_config() -> Result<()> {
        let config = load_templates_if_present("does-not-exist.toml")?;
        assert!(config.templates.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_templates_skips_existing() -> Result<()> {
        let db = setup_test_db().await?;
        let config: TemplatesConfig = toml::from_str(SAMPLE).unwrap();

        assert_eq!(seed_templates(&db, "system", &config).await?, 2);
        assert_eq!(seed_templates(&db, "system", &config).await?, 0);

        let templates = template::list_templates(&db, "system").await?;
        assert_eq!(templates.len(), 2);
        let visa = templates
            .iter()
            .find(|t| t.template.name == "Golden Visa")
            .unwrap();
        assert_eq!(visa.steps.len(), 2);
        assert_eq!(visa.steps[0].label, "Collect documents");
        assert_eq!(visa.steps[1].position, 1);
        Ok(())
    }
}

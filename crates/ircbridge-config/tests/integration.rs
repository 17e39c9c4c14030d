use std::error::Error;

use ircbridge_config::{CharmConfig, ConfigError, DatasourceMatrix, DatasourcePostgreSQL, RawCharmOptions};
use serde_json::json;

#[test]
fn config_get_payload_round_trips_into_validated_config() -> Result<(), Box<dyn Error>> {
    let payload = json!({
        "bot_nickname": "ircbot",
        "bridge_admins": "admin1:example.com, @admin2:example.com",
        "ident_enabled": true
    });
    let options = RawCharmOptions::from_json(payload)?;
    let config = CharmConfig::from_options(&options)?;
    config.validate()?;

    assert!(config.ident_enabled);
    assert_eq!(config.bridge_admins.len(), 2);
    assert!(config.bridge_admins.contains("@admin1:example.com"));
    Ok(())
}

#[test]
fn unset_options_fail_validation_on_the_nickname_first() -> Result<(), Box<dyn Error>> {
    let options = RawCharmOptions::from_json(json!({}))?;
    let config = CharmConfig::from_options(&options)?;
    let Err(ConfigError::InvalidField { field, .. }) = config.validate() else {
        return Err("expected validation failure".into());
    };
    assert_eq!(field, "bot_nickname");
    Ok(())
}

#[test]
fn scenario_datasources_build() -> Result<(), Box<dyn Error>> {
    let db = DatasourcePostgreSQL::new("u", "p", "10.0.0.5", 5432, "irc")?;
    let matrix = DatasourceMatrix::new("https://matrix.example.com", "s3cr3t")?;
    assert_eq!(db.uri.expose(), "postgresql://u:p@10.0.0.5:5432/irc");
    assert_eq!(matrix.shared_secret.expose(), "s3cr3t");
    Ok(())
}

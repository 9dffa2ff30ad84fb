//! Integration tests for the config renderer
//!
//! This test suite covers:
//! - Rendering from inline and file inputs
//! - Render templates derived from the extraction template
//! - Ignore keys
//! - Destination writing and check mode
//! - Error categories and exit codes

mod common;

use common::{SWITCH_CONFIG, VLAN_TEMPLATE};
use indexmap::IndexMap;
use o4n::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn inline(config: &str, template: &str) -> RenderRequest {
    RenderRequest::new(
        ContentSource::Inline(config.into()),
        ContentSource::Inline(template.into()),
    )
}

#[test]
fn test_render_from_files() {
    let dir = TempDir::new().unwrap();
    let config = common::write_file(dir.path(), "running.cfg", SWITCH_CONFIG);
    let template = common::write_file(dir.path(), "vlans.ttp", VLAN_TEMPLATE);

    let request = RenderRequest::new(ContentSource::File(config.clone()), ContentSource::File(template));
    let outcome = Renderer::default().render(&request).unwrap();

    assert_eq!(outcome.render_data.len(), 3);
    assert_eq!(
        outcome.source_used.config_source,
        format!("file:{}", config.display())
    );
    assert!(outcome.rendered_config.starts_with("vlan 15\n name V_Datos_EDF\n"));
}

#[test]
fn test_group_tags_are_stripped_for_rendering() {
    let template = "\
<group name=\"svi\">
interface {{ interface | _start_ }}
 description {{ description | ORPHRASE }}
 ip address {{ ip | IP }} {{ mask }}
</group>
";
    let outcome = Renderer::default()
        .render(&inline(SWITCH_CONFIG, template))
        .unwrap();

    assert_eq!(
        outcome.rendered_config,
        "interface Vlan62\n description gestion\n ip address 10.62.0.2 255.255.255.0"
    );
}

#[test]
fn test_ignored_values_never_rendered() {
    let request = inline(SWITCH_CONFIG, VLAN_TEMPLATE).with_ignore_keys(["V_Voz", "DATOS"]);
    let outcome = Renderer::default().render(&request).unwrap();

    assert_eq!(outcome.rendered_config, "vlan 15\n name V_Datos_EDF");
    assert_eq!(outcome.ignored_instances.len(), 2);
    for record in &outcome.ignored_instances {
        let name = record.get("vlan_name").unwrap();
        assert!(!outcome.rendered_config.contains(name));
    }
}

#[test]
fn test_render_template_with_filters() {
    let request = inline(SWITCH_CONFIG, VLAN_TEMPLATE).with_render_template(ContentSource::Inline(
        "vlan {{ vlan_id }}\n name {{ vlan_name | regex_replace('^V_', 'VLAN_') | lower }}".into(),
    ));
    let outcome = Renderer::default().render(&request).unwrap();

    assert_eq!(
        outcome.rendered_config,
        "vlan 15\n name vlan_datos_edf\nvlan 20\n name vlan_voz\nvlan 62\n name datos_ses_tcs"
    );
}

#[test]
fn test_identical_inputs_render_identically() {
    let renderer = Renderer::default();
    let first = renderer.render(&inline(SWITCH_CONFIG, VLAN_TEMPLATE)).unwrap();
    let second = renderer.render(&inline(SWITCH_CONFIG, VLAN_TEMPLATE)).unwrap();

    assert_eq!(first.rendered_config, second.rendered_config);
}

#[test]
fn test_dest_templated_from_extra_vars() {
    let dir = TempDir::new().unwrap();
    let mut vars = IndexMap::new();
    vars.insert("inventory_hostname".to_string(), serde_json::json!("G3_ACCESO"));
    let dest = format!("{}/{{{{ inventory_hostname }}}}/vlans.cfg", dir.path().display());

    let check = inline(SWITCH_CONFIG, VLAN_TEMPLATE)
        .with_extra_vars(vars.clone())
        .with_dest(dest.clone())
        .check_mode(true);
    let outcome = Renderer::default().render(&check).unwrap();
    let path = dir.path().join("G3_ACCESO/vlans.cfg");
    assert!(outcome.changed);
    assert!(!path.exists());

    let write = inline(SWITCH_CONFIG, VLAN_TEMPLATE)
        .with_extra_vars(vars)
        .with_dest(dest);
    assert!(Renderer::default().render(&write).unwrap().changed);
    assert!(!Renderer::default().render(&write).unwrap().changed);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), outcome.rendered_config);
}

#[test]
fn test_strict_mode_rejects_undefined() {
    let request = inline(SWITCH_CONFIG, VLAN_TEMPLATE)
        .with_render_template(ContentSource::Inline("vlan {{ vlan_id }} {{ site }}".into()));

    let lenient = Renderer::new(false).render(&request).unwrap();
    assert!(lenient.rendered_config.starts_with("vlan 15 \n"));

    let err = Renderer::new(true).render(&request).unwrap_err();
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn test_bad_template_item() {
    let err = Renderer::default()
        .render(&inline(SWITCH_CONFIG, "vlan {{ vlan_id | BOGUS }}"))
        .unwrap_err();

    assert!(matches!(err, Error::Extraction(_)));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_nothing_extracted() {
    let err = Renderer::default()
        .render(&inline("hostname R1\n", VLAN_TEMPLATE))
        .unwrap_err();

    assert!(matches!(err, Error::NoMatches));
    assert_eq!(err.exit_code(), 6);
}

//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};

/// Running configuration of an access switch
pub const SWITCH_CONFIG: &str = "\
hostname G3_ACCESO
!
vlan 15
 name V_Datos_EDF
!
vlan 20
 name V_Voz
!
vlan 62
 name DATOS_SES_TCS
!
interface Vlan62
 description gestion
 ip address 10.62.0.2 255.255.255.0
!
";

/// Extraction template that doubles as its own render template
pub const VLAN_TEMPLATE: &str = "vlan {{ vlan_id | DIGIT | _start_ }}\n name {{ vlan_name }}\n";

/// A localhost port nothing listens on
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Write `content` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// INI inventory with one reachable and one unreachable localhost entry
pub fn scan_inventory(dir: &Path, open_port: u16, closed_port: u16) -> PathBuf {
    write_file(
        dir,
        "hosts.ini",
        &format!(
            "[core]\nSW-UP ansible_host=127.0.0.1 ansible_port={open_port}\n\
             SW-DOWN ansible_host=127.0.0.1 ansible_port={closed_port}\n"
        ),
    )
}

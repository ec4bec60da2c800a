//! Writes the D-Bus broker registration snippet a system authentication
//! daemon would discover this broker through. The reference implementation
//! only writes the file; it does not itself own a D-Bus connection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct BrokerDescriptor {
    pub name: &'static str,
    pub brand_icon: &'static str,
    pub dbus_name: &'static str,
    pub dbus_object: &'static str,
}

pub const EXAMPLE_BROKER: BrokerDescriptor = BrokerDescriptor {
    name: "Example Broker",
    brand_icon: "/usr/share/authd/example-broker.png",
    dbus_name: "com.ubuntu.authd.ExampleBroker",
    dbus_object: "/com/ubuntu/authd/ExampleBroker",
};

/// Render the `[authd]` snippet for `descriptor`.
pub fn render(descriptor: &BrokerDescriptor) -> String {
    format!(
        "[authd]\nname = {}\nbrand_icon = {}\ndbus_name = {}\ndbus_object = {}\n",
        descriptor.name, descriptor.brand_icon, descriptor.dbus_name, descriptor.dbus_object
    )
}

/// Write the snippet into `dir/examplebroker.conf`, creating `dir` if needed.
pub fn write_into(dir: &Path, descriptor: &BrokerDescriptor) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating broker conf directory {}", dir.display()))?;
    let path = dir.join("examplebroker.conf");
    std::fs::write(&path, render(descriptor))
        .with_context(|| format!("writing broker conf snippet to {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_contains_all_four_keys() {
        let out = render(&EXAMPLE_BROKER);
        assert!(out.contains("name = Example Broker"));
        assert!(out.contains("brand_icon ="));
        assert!(out.contains("dbus_name = com.ubuntu.authd.ExampleBroker"));
        assert!(out.contains("dbus_object = /com/ubuntu/authd/ExampleBroker"));
    }

    #[test]
    fn write_into_creates_missing_directories() {
        let dir = std::env::temp_dir().join(format!("authd-broker-conf-test-{}", std::process::id()));
        let path = write_into(&dir, &EXAMPLE_BROKER).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

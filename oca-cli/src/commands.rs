//! Subcommand implementations.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use oca_client::{Controller, Filter, PoolWho, VmFilter};
use oca_template::DynamicTemplate;

use crate::cli::PoolAction;

/// Read a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        return Ok(input);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// XML template to wire text.
pub fn render(path: &Path) -> Result<String> {
    let xml = read_input(path)?;
    let template = DynamicTemplate::parse_xml(&xml)
        .with_context(|| format!("Invalid XML template in {}", path.display()))?;

    debug!(elements = template.len(), "Parsed XML template");
    Ok(template.to_string())
}

/// Wire text to an XML template.
pub fn to_xml(path: &Path, root: &str) -> Result<String> {
    let text = read_input(path)?;
    let template: DynamicTemplate = text
        .parse()
        .with_context(|| format!("Invalid template in {}", path.display()))?;

    debug!(elements = template.len(), "Parsed template");
    Ok(template.to_xml(root))
}

fn pool_filter(action: PoolAction) -> Filter {
    let PoolAction::List { all } = action;
    let mut filter = Filter::new();
    if all {
        filter.set_visibility(PoolWho::All);
    }
    filter
}

pub async fn list_images(controller: &Controller, action: PoolAction) -> Result<Vec<String>> {
    let pool = controller
        .images()
        .info(&pool_filter(action))
        .await
        .context("Failed to list images")?;

    info!(count = pool.len(), "Listed images");
    Ok(pool
        .iter()
        .map(|image| {
            let state = image
                .state()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| image.state_raw.to_string());
            format!(
                "{:>5}  {:<24} {:<16} {:<10} {}",
                image.id, image.name, image.owner.uname, state, image.datastore
            )
        })
        .collect())
}

pub async fn list_documents(
    controller: &Controller,
    doc_type: i64,
    action: PoolAction,
) -> Result<Vec<String>> {
    let pool = controller
        .documents(doc_type)
        .info(&pool_filter(action))
        .await
        .context("Failed to list documents")?;

    info!(count = pool.len(), doc_type, "Listed documents");
    Ok(pool
        .iter()
        .map(|doc| {
            format!(
                "{:>5}  {:<24} {:<16} {}",
                doc.id, doc.name, doc.owner.uname, doc.doc_type
            )
        })
        .collect())
}

pub async fn list_vdcs(controller: &Controller) -> Result<Vec<String>> {
    let pool = controller
        .vdcs()
        .info()
        .await
        .context("Failed to list VDCs")?;

    info!(count = pool.len(), "Listed VDCs");
    Ok(pool
        .iter()
        .map(|vdc| {
            format!(
                "{:>5}  {:<24} groups={} clusters={} hosts={} datastores={} vnets={}",
                vdc.id,
                vdc.name,
                vdc.groups.len(),
                vdc.clusters.len(),
                vdc.hosts.len(),
                vdc.datastores.len(),
                vdc.vnets.len()
            )
        })
        .collect())
}

pub async fn list_vms(controller: &Controller, action: PoolAction) -> Result<Vec<String>> {
    let mut filter = VmFilter::new();
    filter.filter = pool_filter(action);

    let pool = controller
        .vms()
        .info(&filter)
        .await
        .context("Failed to list VMs")?;

    info!(count = pool.len(), "Listed VMs");
    Ok(pool
        .iter()
        .map(|vm| {
            let state = vm
                .state()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| vm.state_raw.to_string());
            let capacity = vm.template.capacity();
            format!(
                "{:>5}  {:<24} {:<16} {:<10} cpu={} vcpu={} memory={}M",
                vm.id,
                vm.name,
                vm.owner.uname,
                state,
                capacity.cpu,
                capacity.vcpu,
                capacity.memory
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oca_client::MockTransport;
    use std::io::Write;
    use std::sync::Arc;

    #[test]
    fn test_render_and_back() {
        let mut xml = tempfile::NamedTempFile::new().unwrap();
        write!(
            xml,
            "<TEMPLATE><NAME>web</NAME><NIC><NETWORK>public</NETWORK></NIC></TEMPLATE>"
        )
        .unwrap();

        let text = render(xml.path()).unwrap();
        assert_eq!(text, "NAME=\"web\"\nNIC=[\n    NETWORK=\"public\" ]");

        let mut wire = tempfile::NamedTempFile::new().unwrap();
        write!(wire, "{}", text).unwrap();
        assert_eq!(
            to_xml(wire.path(), "TEMPLATE").unwrap(),
            "<TEMPLATE><NAME>web</NAME><NIC><NETWORK>public</NETWORK></NIC></TEMPLATE>"
        );
    }

    #[test]
    fn test_missing_file() {
        let err = render(Path::new("/nonexistent/template.xml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn test_list_vms_all() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            "one.vmpool.info",
            "<VM_POOL><VM><ID>3</ID><NAME>db</NAME><UNAME>oneadmin</UNAME><STATE>8</STATE>\
             <TEMPLATE><CPU>1</CPU><MEMORY>2048</MEMORY></TEMPLATE></VM></VM_POOL>",
        );
        let controller = Controller::new(mock.clone());

        let lines = list_vms(&controller, PoolAction::List { all: true })
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("POWEROFF"));
        assert!(lines[0].contains("memory=2048M"));

        let call = mock.last_call().unwrap();
        assert_eq!(call.args, oca_client::args![-2, -1, -1, -1]);
    }
}

//! Prints the Scaler CRD manifest as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/scaler.yaml`

use crds::Scaler;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let yaml = serde_yaml::to_string(&Scaler::crd())?;
    print!("{yaml}");
    Ok(())
}

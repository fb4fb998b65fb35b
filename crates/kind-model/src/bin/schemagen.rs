//! Prints the JSON schema of the declarative cluster model.

use kind_model::ClusterModel;

fn main() -> Result<(), serde_json::Error> {
    let schema = schemars::schema_for!(ClusterModel);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

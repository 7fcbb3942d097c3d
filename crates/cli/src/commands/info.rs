//! `info` command implementation.

use anyhow::{Context, Result};
use angle_engine::{definitions, AngleDefinition};
use contracts::BodyModel;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Catalogue for JSON output
#[derive(Serialize)]
struct CatalogInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    angles: Option<AngleTables>,
    #[serde(skip_serializing_if = "Option::is_none")]
    models: Option<Vec<ModelInfo>>,
}

#[derive(Serialize)]
struct AngleTables {
    joint: Vec<AngleDefinition>,
    segment: Vec<AngleDefinition>,
}

#[derive(Serialize)]
struct ModelInfo {
    name: &'static str,
    aliases: &'static [&'static str],
    keypoints: usize,
    landmarks: Vec<&'static str>,
}

impl From<&'static BodyModel> for ModelInfo {
    fn from(model: &'static BodyModel) -> Self {
        Self {
            name: model.name,
            aliases: model.aliases,
            keypoints: model.detector_width(),
            landmarks: model.landmark_names().collect(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(angles = args.show_angles(), models = args.show_models(), "Listing catalogue");

    let catalog = build_catalog(args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&catalog).context("Failed to serialize catalogue")?;
        println!("{}", json);
    } else {
        print_catalog(&catalog);
    }

    Ok(())
}

fn build_catalog(args: &InfoArgs) -> CatalogInfo {
    CatalogInfo {
        angles: args.show_angles().then(|| AngleTables {
            joint: definitions::joint_angles().copied().collect(),
            segment: definitions::segment_angles().copied().collect(),
        }),
        models: args
            .show_models()
            .then(|| BodyModel::all().iter().map(ModelInfo::from).collect()),
    }
}

fn print_angle(def: &AngleDefinition) {
    println!(
        "  {:<16} {:<40} offset {:>6.1}  sign {:+}",
        def.name,
        def.landmarks.join(" - "),
        def.offset_degrees,
        def.sign
    );
}

fn print_catalog(catalog: &CatalogInfo) {
    if let Some(ref angles) = catalog.angles {
        println!("\n=== Joint angles ({}) ===\n", angles.joint.len());
        angles.joint.iter().for_each(print_angle);
        println!("\n=== Segment angles ({}) ===\n", angles.segment.len());
        angles.segment.iter().for_each(print_angle);
    }

    if let Some(ref models) = catalog.models {
        println!("\n=== Body models ({}) ===\n", models.len());
        for model in models {
            println!(
                "  {:<16} aliases: {:<20} keypoints: {:>3}  landmarks: {}",
                model.name,
                model.aliases.join(", "),
                model.keypoints,
                model.landmarks.len()
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sections_follow_flags() {
        let both = build_catalog(&InfoArgs {
            angles: false,
            models: false,
            json: true,
        });
        let angles = both.angles.unwrap();
        assert!(angles.joint.iter().any(|d| d.name == "right knee"));
        assert!(angles.segment.iter().all(|d| d.is_segment()));
        assert_eq!(both.models.unwrap().len(), BodyModel::all().len());

        let models_only = build_catalog(&InfoArgs {
            angles: false,
            models: true,
            json: true,
        });
        assert!(models_only.angles.is_none());
    }

    #[test]
    fn test_catalog_serializes() {
        let catalog = build_catalog(&InfoArgs {
            angles: true,
            models: true,
            json: true,
        });
        let value = serde_json::to_value(&catalog).unwrap();
        assert_eq!(value["models"][0]["name"], "HALPE_26");
        assert!(value["angles"]["joint"][0]["landmarks"].is_array());
    }
}

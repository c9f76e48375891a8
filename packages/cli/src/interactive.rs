//! Interactive mode for exploring amenities around places.
//!
//! Presents a menu-driven interface using `dialoguer`: search by address
//! or coordinates, adjust the category selection, and optionally save the
//! last result as GeoJSON. Repeated searches for the same place reuse the
//! fetch cache, so switching categories back and forth is cheap.

use std::fs::File;
use std::io::{BufWriter, Write as _};

use amenity_map_amenity::output::write_geojson;
use amenity_map_amenity::pipeline::{CycleResult, Pipeline, PipelineOutcome};
use amenity_map_amenity::registry::Selection;
use amenity_map_boundary_models::LocationQuery;
use amenity_map_cli_utils::{IndicatifProgress, MultiProgress};
use dialoguer::{Input, MultiSelect, Select};

/// Runs the interactive menu loop.
///
/// # Errors
///
/// Returns an error if a prompt, the pipeline, or writing a file fails.
pub async fn run(pipeline: &Pipeline, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let mut selection = Selection::default();
    let mut last: Option<CycleResult> = None;

    println!("Amenity Map");

    loop {
        println!();
        println!(
            "Categories: {} | Specific: {}",
            if selection.categories.is_empty() {
                "(none)".to_string()
            } else {
                selection.categories.join(", ")
            },
            selection.specific
        );

        let items = &[
            "Search by address",
            "Search by coordinates",
            "Change categories",
            "Save last result as GeoJSON",
            "Exit",
        ];

        let choice = Select::new()
            .with_prompt("What would you like to do?")
            .items(items)
            .default(0)
            .interact()?;

        match choice {
            0 => {
                let address: String = Input::new()
                    .with_prompt("Address, city, or neighborhood")
                    .default("San Francisco, CA".to_string())
                    .interact_text()?;
                last = search(pipeline, multi, &LocationQuery::Address(address), &selection).await?;
            }
            1 => {
                let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
                let lon: f64 = Input::new().with_prompt("Longitude").interact_text()?;
                last = search(pipeline, multi, &LocationQuery::Point { lat, lon }, &selection).await?;
            }
            2 => selection = choose_categories(pipeline, &selection)?,
            3 => match &last {
                Some(result) => save(result)?,
                None => println!("Nothing to save yet."),
            },
            4 => {
                println!("Goodbye.");
                return Ok(());
            }
            _ => unreachable!(),
        }
    }
}

async fn search(
    pipeline: &Pipeline,
    multi: &MultiProgress,
    query: &LocationQuery,
    selection: &Selection,
) -> Result<Option<CycleResult>, Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::steps_bar(multi, &format!("Searching {query}"));
    let outcome = pipeline
        .run(Some(query), selection, progress.as_ref())
        .await?;

    let PipelineOutcome::Completed(result) = outcome else {
        return Ok(None);
    };

    println!("{}", result.resolution.status);
    for warning in &result.aggregation.warnings {
        println!("{warning}");
    }

    let collection = &result.aggregation.collection;
    if collection.is_empty() {
        println!("No amenities found.");
    } else {
        println!("Found {} amenities:", collection.len());
        for (category, count) in collection.category_counts() {
            println!("  {category:<24} {count}");
        }
    }

    Ok(Some(*result))
}

fn choose_categories(
    pipeline: &Pipeline,
    current: &Selection,
) -> Result<Selection, Box<dyn std::error::Error>> {
    let catalog = pipeline.catalog();

    let names: Vec<&str> = catalog.categories().iter().map(|c| c.name.as_str()).collect();
    let checked: Vec<bool> = names
        .iter()
        .map(|name| current.categories.iter().any(|c| c.as_str() == *name))
        .collect();
    let picked = MultiSelect::new()
        .with_prompt("Categories (space to toggle)")
        .items(&names)
        .defaults(&checked)
        .interact()?;

    let specific_names: Vec<&str> = catalog
        .specific_amenities()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    let default_specific = specific_names
        .iter()
        .position(|name| *name == current.specific)
        .unwrap_or(0);
    let specific = Select::new()
        .with_prompt("Specific amenity")
        .items(&specific_names)
        .default(default_specific)
        .interact()?;

    Ok(Selection {
        categories: picked.into_iter().map(|i| names[i].to_string()).collect(),
        specific: specific_names[specific].to_string(),
    })
}

fn save(result: &CycleResult) -> Result<(), Box<dyn std::error::Error>> {
    let path: String = Input::new()
        .with_prompt("Output path")
        .default("amenities.geojson".to_string())
        .interact_text()?;

    let mut file = BufWriter::new(File::create(&path)?);
    write_geojson(&result.aggregation.collection, &mut file)?;
    file.flush()?;
    println!(
        "Wrote {} amenities to {path}",
        result.aggregation.collection.len()
    );
    Ok(())
}

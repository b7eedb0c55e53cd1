#!/usr/bin/env cargo
//! Mushroom Inspection Database Seeder
//!
//! A terminal application that fills a running API with realistic inspections.
//! It registers thermometers and inspectors, submits complete inspections with
//! generated photo archives through the multipart endpoint, and generates a
//! report for each of them.
//!
//! Usage:
//!   `cargo run --bin seed_database -- --url http://localhost:3000 --username admin --password secret`

use chrono::{Duration as ChronoDuration, Utc};
use clap::{Arg, Command, value_parser};
use console::style;
use image::{ImageFormat, Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::{Client, multipart};
use serde_json::{Value, json};
use std::error::Error;
use std::io::{Cursor, Write};
use tokio::time::{Duration, sleep};

type SeedResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Clone)]
pub struct SeedingConfig {
    pub base_url: String,
    pub access_token: String,
    pub client: Client,
}

#[derive(Debug, Default)]
pub struct CreatedObjects {
    pub thermometers: Vec<Value>,
    pub inspectors: Vec<Value>,
    pub inspections: Vec<Value>,
    pub reports: Vec<Value>,
}

pub struct DatabaseSeeder {
    config: SeedingConfig,
    created_objects: CreatedObjects,
}

fn progress_bar(len: usize) -> SeedResult<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// A ZIP archive of `count` solid-colour PNG photos named `<prefix>_<n>.png`
fn photo_archive(prefix: &str, count: usize) -> SeedResult<Vec<u8>> {
    let mut rng = rand::rng();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    for n in 1..=count {
        let colour = Rgb([
            rng.random_range(140..=220),
            rng.random_range(110..=190),
            rng.random_range(70..=150),
        ]);
        let (width, height) = if rng.random_bool(0.5) { (640, 480) } else { (480, 640) };
        let photo = RgbImage::from_pixel(width, height, colour);

        let mut png = Cursor::new(Vec::new());
        photo.write_to(&mut png, ImageFormat::Png)?;
        writer.start_file(format!("{prefix}_{n}.png"), options)?;
        writer.write_all(&png.into_inner())?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Random flattened form fields for one inspection
fn inspection_fields(day: usize, inspector: &str, thermometer: &str) -> Vec<(String, String)> {
    let mut rng = rand::rng();
    let date = (Utc::now() - ChronoDuration::days(i64::try_from(day).unwrap_or(0))).date_naive();
    let pallets: u32 = rng.random_range(2..=6);
    let boxes_per_pallet: u32 = rng.random_range(20..=40);
    let min_temperature: f64 = rng.random_range(0.5..2.0);
    let sample: f64 = rng.random_range(8.0..12.0);
    let conforming = sample * rng.random_range(0.85..0.98);
    let off_grade_small = (sample - conforming) * rng.random_range(0.3..0.7);

    let mut fields = vec![
        ("inspection_date".to_string(), date.format("%Y-%m-%d").to_string()),
        ("inspector".to_string(), inspector.to_string()),
        ("job_number".to_string(), format!("JOB-{}", 1000 + day)),
        ("mushroom_storage[0].quantity_of_boxes".to_string(), (pallets * boxes_per_pallet).to_string()),
        ("mushroom_storage[0].quantity_of_pallets".to_string(), pallets.to_string()),
        ("mushroom_storage[0].temperature_in_fridge".to_string(), format!("{:.1}", rng.random_range(1.0..4.0))),
        ("mushroom_storage[0].mushroom_temperature_min".to_string(), format!("{min_temperature:.1}")),
        ("mushroom_storage[0].mushroom_temperature_max".to_string(), format!("{:.1}", min_temperature + 1.5)),
        ("mushroom_storage[0].thermometer".to_string(), thermometer.to_string()),
        ("mushroom_storage[0].invoice_number".to_string(), format!("INV-{}", rng.random_range(100..999))),
        ("quantity_inspections[0].scale_model".to_string(), "ВЭ-15".to_string()),
        ("quantity_inspections[0].scale_serial_number".to_string(), "S-0417".to_string()),
        ("quality_inspections[0].sample_mass_kg".to_string(), format!("{sample:.2}")),
        ("quality_inspections[0].conforms_to_declared_grade".to_string(), format!("{conforming:.2}")),
        ("quality_inspections[0].off_grade_mass_kg_50".to_string(), format!("{off_grade_small:.2}")),
        ("quality_inspections[0].off_grade_mass_kg_70".to_string(), format!("{:.2}", sample - conforming - off_grade_small)),
        ("diameter_measurements[0].average_diameter".to_string(), rng.random_range(45..=65).to_string()),
        ("product_loading[0].mushroom_temperature".to_string(), format!("{:.1}", rng.random_range(1.5..3.5))),
        ("product_loading[0].car_number".to_string(), format!("{} AB-7", rng.random_range(1000..9999))),
        ("product_loading[0].thermometer".to_string(), thermometer.to_string()),
    ];

    for n in 0..pallets {
        let pallet: f64 = rng.random_range(9.0..12.0);
        let gross = pallet + f64::from(boxes_per_pallet) * rng.random_range(3.9..4.3);
        fields.push((format!("quantity_inspections[0].boxes[{n}].gross_weight"), format!("{gross:.1}")));
        fields.push((format!("quantity_inspections[0].boxes[{n}].pallet_weight"), format!("{pallet:.1}")));
    }
    fields
}

impl DatabaseSeeder {
    pub fn new(base_url: &str, access_token: String) -> SeedResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            config: SeedingConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                access_token,
                client,
            },
            created_objects: CreatedObjects::default(),
        })
    }

    /// Exchanges credentials for an access token
    pub async fn authenticate(base_url: &str, username: &str, password: &str) -> SeedResult<String> {
        let url = format!("{}/api/token", base_url.trim_end_matches('/'));
        let response = Client::new()
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Authentication failed with HTTP {status}: {error_text}").into());
        }
        let tokens = response.json::<Value>().await?;
        tokens["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| "token response has no access_token".into())
    }

    async fn make_request(&self, method: &str, endpoint: &str, data: Option<Value>) -> SeedResult<Value> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let request = match method.to_uppercase().as_str() {
            "GET" => self.config.client.get(&url),
            "POST" => self.config.client.post(&url),
            _ => return Err("Unsupported HTTP method".into()),
        };
        let mut request = request.bearer_auth(&self.config.access_token);
        if let Some(json_data) = data {
            request = request.json(&json_data);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response.json::<Value>().await?)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(format!("HTTP {status} {endpoint}: {error_text}").into())
        }
    }

    async fn make_multipart_request(&self, endpoint: &str, form: multipart::Form) -> SeedResult<Value> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let response = self
            .config
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .multipart(form)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<Value>().await?)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(format!("HTTP {status} {endpoint}: {error_text}").into())
        }
    }

    pub async fn create_thermometers(&mut self) -> SeedResult<()> {
        println!("{} Registering thermometers...", style("[1/4]").bold().dim());

        let thermometers = [
            json!({"info": "Testo 104 food thermometer", "serial": "T104-2231", "calibration_date": "2025-01-15"}),
            json!({"info": "ТЦ-1 digital thermometer", "serial": "TC1-0098", "calibration_date": "2024-11-05"}),
        ];

        let pb = progress_bar(thermometers.len())?;
        for thermometer in thermometers {
            pb.set_message(format!("Creating: {}", thermometer["info"].as_str().unwrap_or_default()));
            let result = self
                .make_request("POST", "/api/thermometers", Some(thermometer))
                .await?;
            self.created_objects.thermometers.push(result);
            pb.inc(1);
        }
        pb.finish_with_message("Thermometers registered!");
        Ok(())
    }

    pub async fn create_inspectors(&mut self) -> SeedResult<()> {
        println!("{} Creating inspectors...", style("[2/4]").bold().dim());

        let inspectors = [
            json!({"username": "o.ivanova", "password": "inspector", "first_name": "Ольга", "last_name": "Иванова", "role": "inspector"}),
            json!({"username": "d.smirnov", "password": "inspector", "first_name": "Дмитрий", "last_name": "Смирнов", "role": "inspector"}),
        ];

        let pb = progress_bar(inspectors.len())?;
        for inspector in inspectors {
            let username = inspector["username"].as_str().unwrap_or_default().to_string();
            pb.set_message(format!("Creating: {username}"));
            match self.make_request("POST", "/api/users", Some(inspector)).await {
                Ok(result) => self.created_objects.inspectors.push(result),
                Err(e) if e.to_string().contains("409") => {
                    pb.println(format!("{} {username} already exists", style("•").dim()));
                }
                Err(e) => return Err(e),
            }
            pb.inc(1);
        }
        pb.finish_with_message("Inspectors ready!");

        if self.created_objects.inspectors.is_empty() {
            let users = self.make_request("GET", "/api/users", None).await?;
            self.created_objects.inspectors = users.as_array().cloned().unwrap_or_default();
        }
        Ok(())
    }

    pub async fn create_inspections(&mut self, count: usize) -> SeedResult<()> {
        println!("{} Submitting inspections with photos...", style("[3/4]").bold().dim());

        let pb = progress_bar(count)?;
        for day in 0..count {
            let inspector = &self.created_objects.inspectors[day % self.created_objects.inspectors.len()];
            let thermometer =
                &self.created_objects.thermometers[day % self.created_objects.thermometers.len()];
            let fields = inspection_fields(
                day,
                inspector["id"].as_str().unwrap_or_default(),
                thermometer["id"].as_str().unwrap_or_default(),
            );

            let mut form = multipart::Form::new();
            for (key, value) in fields {
                form = form.text(key, value);
            }
            for (section, prefix) in [
                ("mushroom_storage", "placement"),
                ("marking_zips", "marking"),
                ("quantity_inspections", "quantity"),
                ("quality_inspections", "quality"),
                ("diameter_measurements", "diameter"),
                ("pallets", "pallet"),
                ("product_loading", "loading"),
            ] {
                let archive = photo_archive(prefix, 2)?;
                form = form.part(
                    format!("{section}[0].zip_photos"),
                    multipart::Part::bytes(archive)
                        .file_name(format!("{prefix}.zip"))
                        .mime_str("application/zip")?,
                );
            }

            pb.set_message(format!("Inspection {}", day + 1));
            let inspection = self
                .make_multipart_request("/api/inspections/full", form)
                .await?;
            self.created_objects.inspections.push(inspection);
            pb.inc(1);
            sleep(Duration::from_millis(100)).await;
        }
        pb.finish_with_message("Inspections submitted!");
        Ok(())
    }

    /// Generates a report per inspection using its first photo of every section
    pub async fn generate_reports(&mut self) -> SeedResult<()> {
        println!("{} Generating reports...", style("[4/4]").bold().dim());

        let inspection_ids: Vec<String> = self
            .created_objects
            .inspections
            .iter()
            .filter_map(|inspection| inspection["id"].as_str().map(str::to_string))
            .collect();

        let pb = progress_bar(inspection_ids.len())?;
        for id in inspection_ids {
            let photos = self
                .make_request("GET", &format!("/api/inspections/{id}/photos"), None)
                .await?;
            let first_of = |section: &str| -> Vec<Value> {
                photos
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter(|photo| photo["section"] == section)
                    .take(1)
                    .map(|photo| photo["id"].clone())
                    .collect()
            };
            let selection = json!({
                "placement_photo_ids": first_of("placement"),
                "marking_photo_ids": first_of("marking"),
                "quantity_photo_ids": first_of("quantity"),
                "quality_photo_ids": first_of("quality"),
                "diameter_photo_ids": first_of("diameter"),
                "pallet_photo_ids": first_of("pallets"),
                "loading_photo_ids": first_of("loading"),
            });

            match self
                .make_request("POST", &format!("/api/inspections/{id}/report"), Some(selection))
                .await
            {
                Ok(report) => self.created_objects.reports.push(report),
                Err(e) => pb.println(format!("{} Report for {id} failed: {e}", style("⚠").yellow())),
            }
            pb.inc(1);
        }
        pb.finish_with_message("Reports generated!");
        Ok(())
    }

    pub async fn seed_database(&mut self, inspections: usize) -> SeedResult<()> {
        println!();
        println!("{}", style("Mushroom Inspection Seeder").bold().blue());
        println!("{}", style("Creating realistic inspection records...").dim());
        println!();

        self.create_thermometers().await?;
        self.create_inspectors().await?;
        if self.created_objects.inspectors.is_empty() {
            return Err("no inspector is available to assign inspections to".into());
        }
        self.create_inspections(inspections).await?;
        self.generate_reports().await?;

        self.display_summary();
        Ok(())
    }

    fn display_summary(&self) {
        println!();
        println!("{}", style("Database Seeding Complete!").bold().green());
        println!("{}", style("═".repeat(50)).dim());

        let summary_data = [
            ("Thermometers", self.created_objects.thermometers.len()),
            ("Inspectors", self.created_objects.inspectors.len()),
            ("Inspections", self.created_objects.inspections.len()),
            ("Reports", self.created_objects.reports.len()),
        ];
        for (name, count) in summary_data {
            if count > 0 {
                println!("{:.<20} {}", style(name).cyan(), style(count).bold().green());
            }
        }

        for report in &self.created_objects.reports {
            println!(
                "  {} {}",
                style("•").dim(),
                report["url"].as_str().unwrap_or_default()
            );
        }
        println!();
    }
}

#[tokio::main]
async fn main() -> SeedResult<()> {
    let matches = Command::new("Mushroom Inspection Seeder")
        .version("1.0")
        .about("Seeds the inspection API with inspections, photos and reports")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("API base URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .value_name("USERNAME")
                .help("Administrator username")
                .default_value("admin"),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .value_name("PASSWORD")
                .help("Administrator password")
                .required(true),
        )
        .arg(
            Arg::new("inspections")
                .short('n')
                .long("inspections")
                .value_name("COUNT")
                .help("Number of inspections to submit")
                .value_parser(value_parser!(usize))
                .default_value("5"),
        )
        .get_matches();

    let base_url = matches
        .get_one::<String>("url")
        .cloned()
        .unwrap_or_default();
    let username = matches
        .get_one::<String>("username")
        .cloned()
        .unwrap_or_default();
    let password = matches
        .get_one::<String>("password")
        .cloned()
        .unwrap_or_default();
    let inspections = matches.get_one::<usize>("inspections").copied().unwrap_or(5);

    println!("{}", style("Mushroom Inspection Seeder v1.0").bold());
    println!("{}", style("━".repeat(40)).dim());
    println!("API URL: {}", style(&base_url).cyan());
    println!("User:    {}", style(&username).cyan());

    let access_token = DatabaseSeeder::authenticate(&base_url, &username, &password).await?;
    let mut seeder = DatabaseSeeder::new(&base_url, access_token)?;
    seeder.seed_database(inspections).await?;

    Ok(())
}

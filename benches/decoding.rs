use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use walkdir::WalkDir;

use qrnova::common::DecoderConfig;
use qrnova::reader::BinarizerKind;
use qrnova::QRReader;

mod utils;
use utils::*;

fn readers() -> Vec<(&'static str, QRReader)> {
    let only = |kind| DecoderConfig { strategies: vec![kind], ..Default::default() };
    vec![
        ("hybrid", QRReader::with_config(&only(BinarizerKind::Hybrid))),
        ("global", QRReader::with_config(&only(BinarizerKind::GlobalHistogram))),
        ("chain", QRReader::new()),
    ]
}

fn benchmark(dataset_dir: &Path) {
    let image_paths: Vec<PathBuf> = WalkDir::new(dataset_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(is_image_file)
        .map(|e| e.path().to_path_buf())
        .collect();

    let readers = readers();
    let results = Mutex::new(HashMap::<String, HashMap<String, u128>>::new());
    let runtimes = Mutex::new(HashMap::<String, Vec<u128>>::new());

    image_paths.par_iter().for_each(|img_path| {
        let parent = get_parent(img_path);
        let Ok(img) = image::open(img_path) else {
            return;
        };
        let exp_msg = parse_expected_decode_result(&img_path.with_extension("txt"));

        for (name, reader) in readers.iter() {
            let start = Instant::now();
            let res = reader.read(&img);
            let elapsed = start.elapsed();

            if *name == "chain" {
                let mut runtimes = runtimes.lock().unwrap();
                runtimes.entry(parent.clone()).or_default().push(elapsed.as_micros());
            }

            let Ok(Some(msg)) = res else {
                continue;
            };
            let msg = msg.lines().map(String::from).collect::<Vec<_>>();
            if msg == exp_msg {
                let mut results = results.lock().unwrap();
                *results.entry(parent.clone()).or_default().entry(name.to_string()).or_default() +=
                    1;
            }
        }

        let mut results = results.lock().unwrap();
        *results.entry(parent).or_default().entry("images".to_string()).or_default() += 1;
    });

    let mut results = results.into_inner().unwrap();
    let mut runtimes = runtimes.into_inner().unwrap();
    if results.is_empty() {
        println!("No images found under {}", dataset_dir.display());
        return;
    }

    // Median and average runtime of the full chain per folder
    let mut total: HashMap<String, u128> = HashMap::new();
    for (k, v) in results.iter_mut() {
        if let Some(runtime) = runtimes.get_mut(k).filter(|r| !r.is_empty()) {
            runtime.sort_unstable();
            let mid = runtime.len() / 2;
            let median_time = if runtime.len() % 2 == 1 {
                runtime[mid]
            } else {
                (runtime[mid - 1] + runtime[mid]) / 2
            };
            let avg_time = runtime.iter().sum::<u128>() / runtime.len() as u128;
            v.insert("median_time".to_string(), median_time);
            v.insert("avg_time".to_string(), avg_time);
        }

        for (kc, vc) in v.iter() {
            *total.entry(kc.to_string()).or_default() += vc;
        }
    }
    let folders = results.len() as u128;
    for key in ["median_time", "avg_time"] {
        if let Some(t) = total.get_mut(key) {
            *t /= folders;
        }
    }
    results.insert("total".to_string(), total);

    let mut rows = results.keys().map(|s| s.as_str()).collect::<Vec<_>>();
    rows.sort_unstable();
    let cols = ["Folder", "images", "hybrid", "global", "chain", "median_time", "avg_time"];

    println!("\nResult:");
    print_table(&results, &rows, &cols);
}

fn main() {
    let dataset_dir =
        std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| "benches/dataset".into());

    let start = Instant::now();
    benchmark(&dataset_dir);
    println!("Time elapsed: {:?}", start.elapsed());
}

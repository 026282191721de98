//! End to end: raw gp_history exports in, bucketed archive out, positions back.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::mock::StepRng;

use gp_archive::aggregate;
use gp_archive::archive::{parse_day_string, BucketSchedule, DirSource, ElementRow, CATALOG_FILE};
use gp_archive::catalog::{Catalog, ObjectClass, SizeClass};
use gp_archive::dataset::{Dataset, DatasetConfig};
use gp_archive::position::{Sgp4Propagator, TrackState};

const ISS_LINE1: &str = "1 25544U 98067A   21245.53748218  .00003969  00000-0  81292-4 0  9995";
const ISS_LINE2: &str = "2 25544  51.6442 320.2331 0003041 346.4163 145.5195 15.48587491300581";

// gp_history CSV column positions, as written by the export tooling.
const COL_OBJECT_NAME: usize = 4;
const COL_OBJECT_ID: usize = 5;
const COL_EPOCH: usize = 10;
const COL_NORAD_CAT_ID: usize = 19;
const COL_REV_AT_EPOCH: usize = 21;
const COL_OBJECT_TYPE: usize = 29;
const COL_RCS_SIZE: usize = 30;
const COL_COUNTRY_CODE: usize = 31;
const COL_LAUNCH_DATE: usize = 32;
const COL_SITE: usize = 33;
const COL_DECAY_DATE: usize = 34;
const COL_TLE_LINE1: usize = 38;
const COL_TLE_LINE2: usize = 39;

fn omm_row(catalog_id: u32, epoch: &str, fields: &[(usize, &str)]) -> Vec<String> {
    let mut row = vec![String::new(); 40];
    row[COL_NORAD_CAT_ID] = catalog_id.to_string();
    row[COL_EPOCH] = epoch.to_string();
    for &(col, value) in fields {
        row[col] = value.to_string();
    }
    row
}

/// A tracked debris fragment. Early exports carry a placeholder name and no
/// launch data; once cataloged the rows fill in. The element lines are too
/// short to parse, like plenty of rows in historical dumps.
fn debris_row(epoch: &str, cataloged: bool) -> Vec<String> {
    let mut fields = vec![
        (COL_OBJECT_ID, "1999-025AA"),
        (COL_OBJECT_TYPE, "DEBRIS"),
        (COL_TLE_LINE1, "1 90001U 99025AAA 21182.00000000"),
        (COL_TLE_LINE2, "2 90001  98.7654"),
    ];
    if cataloged {
        fields.extend([
            (COL_OBJECT_NAME, "FENGYUN 1C DEB"),
            (COL_COUNTRY_CODE, "PRC"),
            (COL_LAUNCH_DATE, "1999-05-10"),
            (COL_SITE, "TSC"),
            (COL_DECAY_DATE, "2022-03-01"),
        ]);
    } else {
        fields.push((COL_OBJECT_NAME, "TBA - TO BE ASSIGNED"));
    }
    omm_row(90001, epoch, &fields)
}

fn iss_row(epoch: &str) -> Vec<String> {
    omm_row(
        25544,
        epoch,
        &[
            (COL_OBJECT_NAME, "ISS (ZARYA)"),
            (COL_OBJECT_ID, "1998-067A"),
            (COL_REV_AT_EPOCH, "30058"),
            (COL_OBJECT_TYPE, "PAYLOAD"),
            (COL_RCS_SIZE, "LARGE"),
            (COL_COUNTRY_CODE, "ISS"),
            (COL_LAUNCH_DATE, "1998-11-20"),
            (COL_SITE, "TYMSC"),
            (COL_TLE_LINE1, ISS_LINE1),
            (COL_TLE_LINE2, ISS_LINE2),
        ],
    )
}

fn write_raw_file(path: &Path, rows: &[Vec<String>]) {
    let gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(gz);
    writer.write_record(["CCSDS_OMM_VERS", "2.0"]).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.into_inner().unwrap().finish().unwrap();
}

/// Three monthly exports: the debris fragment every three days through July
/// and August, then the ISS twice a day apart plus once three weeks later.
fn build_raw_dump(raw_dir: &Path) {
    let july: Vec<_> = (1..=31)
        .step_by(3)
        .map(|day| debris_row(&format!("2021-07-{day:02}T00:00:00"), false))
        .collect();
    let august: Vec<_> = (3..=30)
        .step_by(3)
        .map(|day| debris_row(&format!("2021-08-{day:02}T00:00:00"), true))
        .collect();
    let september = vec![
        iss_row("2021-09-02T12:53:58.146304"),
        iss_row("2021-09-03T12:00:00"),
        iss_row("2021-09-22T12:00:00"),
    ];
    write_raw_file(&raw_dir.join("2021-07.csv.gz"), &july);
    write_raw_file(&raw_dir.join("2021-08.csv.gz"), &august);
    write_raw_file(&raw_dir.join("2021-09.csv.gz"), &september);
}

fn read_bucket(dir: &Path, name: &str) -> Vec<ElementRow> {
    let file = File::open(dir.join(format!("{name}.csv.gz"))).unwrap();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(GzDecoder::new(file)));
    reader
        .records()
        .map(|record| ElementRow::parse(&record.unwrap()).unwrap())
        .collect()
}

fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

#[test]
fn aggregate_builds_a_thinned_self_contained_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let raw_dir = tmp.path().join("raw");
    let out_dir = tmp.path().join("archive");
    fs::create_dir(&raw_dir).unwrap();
    build_raw_dump(&raw_dir);

    let summary = aggregate::run(&raw_dir, &out_dir).unwrap();
    assert_eq!(summary.raw.files, 3);
    assert_eq!(summary.raw.records, 24);
    // one header line per export
    assert_eq!(summary.raw.skipped, 3);
    assert_eq!(summary.objects, 2);
    assert_eq!(summary.archived, 11);

    let source = DirSource::new(&out_dir);
    let names = source.bucket_names().unwrap();
    assert_eq!(names.first().map(String::as_str), Some("1959-01-01"));
    let schedule = BucketSchedule::through(parse_day_string(names.last().unwrap()).unwrap());
    // every scheduled bucket up to the newest epoch exists, empty or not
    assert_eq!(names.len(), schedule.len());
    assert_eq!(summary.buckets, schedule.len());

    let mut epochs: BTreeMap<u32, Vec<DateTime<Utc>>> = BTreeMap::new();
    for name in &names {
        let index = schedule.index_of(parse_day_string(name).unwrap());
        let bucket = schedule.get(index).unwrap();
        for row in read_bucket(&out_dir, name) {
            assert!(
                bucket.contains(row.epoch),
                "row at {} landed outside bucket {}",
                row.epoch,
                name
            );
            epochs.entry(row.catalog_id).or_default().push(row.epoch);
        }
    }
    // the sample right before each >2 week advance survives, plus the
    // trailing sample committed at each bucket close
    assert_eq!(
        epochs[&90001],
        vec![
            utc(2021, 7, 1, 0),
            utc(2021, 7, 13, 0),
            utc(2021, 7, 16, 0),
            utc(2021, 7, 28, 0),
            utc(2021, 7, 31, 0),
            utc(2021, 8, 12, 0),
            utc(2021, 8, 15, 0),
            utc(2021, 8, 27, 0),
            utc(2021, 8, 30, 0),
        ]
    );
    assert_eq!(
        epochs[&25544],
        vec![utc(2021, 9, 3, 12), utc(2021, 9, 22, 12)]
    );

    let file = File::open(out_dir.join(CATALOG_FILE)).unwrap();
    let catalog = Catalog::from_reader(BufReader::new(GzDecoder::new(file))).unwrap();
    assert_eq!(catalog.len(), 2);
    let iss = catalog.by_id(25544).unwrap();
    assert_eq!(iss.name.as_deref(), Some("ISS (ZARYA)"));
    assert_eq!(iss.object_class, ObjectClass::Payload);
    assert_eq!(iss.size_class, SizeClass::Large);
    assert_eq!(iss.launch.launch_date, Some(utc(1998, 11, 20, 0)));
    assert_eq!(iss.launch.launch_site.as_deref(), Some("TYMSC"));
    assert_eq!(iss.decay_date, None);
    let debris = catalog.by_id(90001).unwrap();
    // the placeholder name from the early exports never sticks
    assert_eq!(debris.name.as_deref(), Some("FENGYUN 1C DEB"));
    assert_eq!(debris.object_class, ObjectClass::Debris);
    // no radar cross-section was ever reported
    assert_eq!(debris.size_class, SizeClass::Small);
    assert_eq!(debris.launch.country_code.as_deref(), Some("PRC"));
    assert_eq!(debris.launch.launch_date, Some(utc(1999, 5, 10, 0)));
    assert_eq!(debris.decay_date, Some(utc(2022, 3, 1, 0)));
}

#[test]
fn archived_elements_drive_position_queries() {
    let tmp = tempfile::tempdir().unwrap();
    let raw_dir = tmp.path().join("raw");
    let out_dir = tmp.path().join("archive");
    fs::create_dir(&raw_dir).unwrap();
    build_raw_dump(&raw_dir);
    aggregate::run(&raw_dir, &out_dir).unwrap();

    let source = DirSource::new(&out_dir);
    let names = source.bucket_names().unwrap();
    let schedule = BucketSchedule::through(parse_day_string(names.last().unwrap()).unwrap());
    let config = DatasetConfig {
        purge_batch: 1,
        ..DatasetConfig::default()
    };
    let mut dataset = Dataset::open(source, schedule, config).unwrap();

    let t = utc(2021, 9, 3, 12);
    dataset.advance_to(t).unwrap();
    let slot = dataset.catalog().index_of(25544).unwrap();
    assert_eq!(dataset.samples(slot).unwrap().len(), 2);

    let update_period = dataset.config().update_period;
    let accuracy = dataset.config().accuracy;
    let mut rng = StepRng::new(0, 0);

    let iss = dataset.catalog().by_id(25544).unwrap();
    let mut state = TrackState::new(iss, update_period, accuracy, &mut rng);
    assert!(state.is_in_window(t));
    let position = state
        .position_at(dataset.samples(slot).unwrap(), &Sgp4Propagator, t)
        .expect("a satellite with samples has a position");
    let radius = position.iter().map(|c| c * c).sum::<f64>().sqrt();
    assert!(
        (6500.0..7100.0).contains(&radius),
        "implausible orbit radius {radius} km"
    );

    // the debris rows carried unusable element lines, skipped on load
    let debris_slot = dataset.catalog().index_of(90001).unwrap();
    assert!(dataset.samples(debris_slot).unwrap().is_empty());
    let debris = dataset.catalog().by_id(90001).unwrap();
    let mut debris_state = TrackState::new(debris, update_period, accuracy, &mut rng);
    assert!(debris_state.is_in_window(t));
    assert_eq!(
        debris_state.position_at(dataset.samples(debris_slot).unwrap(), &Sgp4Propagator, t),
        None
    );

    // move the retention window far past the data, then come back
    dataset.purge(t + Duration::days(4 * 365));
    assert_eq!(dataset.loaded_buckets(), 0);
    assert!(dataset.samples(slot).unwrap().is_empty());
    dataset.advance_to(t).unwrap();
    assert_eq!(dataset.samples(slot).unwrap().len(), 2);
}

use std::collections::HashMap;

use super::{Catalog, LaunchInfo, ObjectClass, Satellite, SizeClass};
use crate::archive::parse_day_string;

/// Upstream placeholder tokens, matched by prefix. A field carrying one of
/// these is treated the same as an empty field.
const PLACEHOLDER_PREFIXES: [&str; 5] = ["TBA", "UNKNOWN", "OBJECT", "NULL", "TBD"];

/// Objects from one launch share the `YYYY-NNN` prefix of their designator.
const LAUNCH_KEY_LEN: usize = 8;

fn acceptable(value: &str) -> bool {
    !value.is_empty() && !PLACEHOLDER_PREFIXES.iter().any(|p| value.starts_with(p))
}

/// First accepted value wins; placeholders never displace a real one.
fn accept_keep(slot: &mut String, value: &str) {
    if acceptable(value) && !acceptable(slot) {
        *slot = value.to_string();
    }
}

/// Any later acceptable value wins. Used for the fields that get better
/// known over an object's lifetime.
fn accept_latest(slot: &mut String, value: &str) {
    if acceptable(value) {
        *slot = value.to_string();
    }
}

fn launch_key(object_id: &str) -> Option<&str> {
    if acceptable(object_id) {
        // `get` also rejects designators whose eighth byte splits a character.
        object_id.get(..LAUNCH_KEY_LEN)
    } else {
        None
    }
}

/// Descriptive fields of one raw record, as extracted upstream.
#[derive(Debug, Clone, Copy)]
pub struct ObjectFields<'a> {
    pub catalog_id: u32,
    pub object_id: &'a str,
    pub name: &'a str,
    pub object_class: &'a str,
    pub size_class: &'a str,
    pub country_code: &'a str,
    pub launch_date: &'a str,
    pub launch_site: &'a str,
    pub decay_date: &'a str,
}

#[derive(Debug, Default)]
struct PendingObject {
    catalog_id: u32,
    object_id: String,
    name: String,
    object_class: String,
    size_class: String,
    decay_date: String,
    launch: Option<usize>,
}

#[derive(Debug, Default)]
struct PendingLaunch {
    country_code: String,
    launch_date: String,
    launch_site: String,
}

/// Accumulates per-object metadata across many raw extracts. Merging is
/// order-insensitive apart from the two latest-value fields.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    objects: Vec<PendingObject>,
    by_id: HashMap<u32, usize>,
    launches: Vec<PendingLaunch>,
    by_launch_key: HashMap<String, usize>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn merge(&mut self, fields: &ObjectFields) {
        let slot = match self.by_id.get(&fields.catalog_id) {
            Some(&slot) => slot,
            None => {
                let slot = self.objects.len();
                self.by_id.insert(fields.catalog_id, slot);
                self.objects.push(PendingObject {
                    catalog_id: fields.catalog_id,
                    ..PendingObject::default()
                });
                slot
            }
        };

        let object = &mut self.objects[slot];
        accept_keep(&mut object.object_id, fields.object_id);
        accept_keep(&mut object.name, fields.name);
        accept_keep(&mut object.object_class, fields.object_class);
        accept_latest(&mut object.size_class, fields.size_class);
        accept_latest(&mut object.decay_date, fields.decay_date);

        if object.launch.is_none() {
            if let Some(key) = launch_key(&object.object_id) {
                let launch_slot = match self.by_launch_key.get(key) {
                    Some(&existing) => existing,
                    None => {
                        let created = self.launches.len();
                        self.by_launch_key.insert(key.to_string(), created);
                        self.launches.push(PendingLaunch::default());
                        created
                    }
                };
                self.objects[slot].launch = Some(launch_slot);
            }
        }
        if let Some(launch_slot) = self.objects[slot].launch {
            let launch = &mut self.launches[launch_slot];
            accept_keep(&mut launch.country_code, fields.country_code);
            accept_keep(&mut launch.launch_date, fields.launch_date);
            accept_keep(&mut launch.launch_site, fields.launch_site);
        }
    }

    /// Resolves shared launch records and size defaults, yielding satellites
    /// in discovery order.
    pub fn finalize(self) -> Catalog {
        let mut catalog = Catalog::new();
        for object in self.objects {
            let object_class = ObjectClass::parse(&object.object_class);
            let size_class = SizeClass::parse(&object.size_class)
                .unwrap_or_else(|| SizeClass::default_for(object_class));
            let launch = object
                .launch
                .map(|slot| &self.launches[slot])
                .map(|launch| LaunchInfo {
                    country_code: non_empty(&launch.country_code),
                    launch_date: parse_day_string(&launch.launch_date),
                    launch_site: non_empty(&launch.launch_site),
                })
                .unwrap_or_default();
            catalog.push(Satellite {
                catalog_id: object.catalog_id,
                object_id: non_empty(&object.object_id),
                name: non_empty(&object.name),
                object_class,
                size_class,
                launch,
                decay_date: parse_day_string(&object.decay_date),
            });
        }
        catalog
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod merge_tests {
    use super::*;

    fn fields(catalog_id: u32) -> ObjectFields<'static> {
        ObjectFields {
            catalog_id,
            object_id: "",
            name: "",
            object_class: "",
            size_class: "",
            country_code: "",
            launch_date: "",
            launch_site: "",
            decay_date: "",
        }
    }

    #[test]
    fn placeholder_never_overwrites_a_real_name() {
        let mut builder = CatalogBuilder::new();
        builder.merge(&ObjectFields {
            name: "TBA-1",
            ..fields(1)
        });
        builder.merge(&ObjectFields {
            name: "ISS",
            ..fields(1)
        });
        builder.merge(&ObjectFields {
            name: "TBA-2",
            ..fields(1)
        });
        let catalog = builder.finalize();
        assert_eq!(catalog.by_id(1).unwrap().name.as_deref(), Some("ISS"));
    }

    #[test]
    fn first_accepted_name_wins() {
        let mut builder = CatalogBuilder::new();
        builder.merge(&ObjectFields {
            name: "ISS",
            ..fields(1)
        });
        builder.merge(&ObjectFields {
            name: "ZARYA",
            ..fields(1)
        });
        let catalog = builder.finalize();
        assert_eq!(catalog.by_id(1).unwrap().name.as_deref(), Some("ISS"));
    }

    #[test]
    fn size_and_decay_take_the_latest_value() {
        let mut builder = CatalogBuilder::new();
        builder.merge(&ObjectFields {
            size_class: "MEDIUM",
            decay_date: "2002-03-01",
            ..fields(7)
        });
        builder.merge(&ObjectFields {
            size_class: "LARGE",
            decay_date: "2002-04-15",
            ..fields(7)
        });
        builder.merge(&ObjectFields {
            size_class: "",
            decay_date: "TBD",
            ..fields(7)
        });
        let catalog = builder.finalize();
        let satellite = catalog.by_id(7).unwrap();
        assert_eq!(satellite.size_class, SizeClass::Large);
        assert_eq!(
            satellite.decay_date,
            parse_day_string("2002-04-15")
        );
    }

    #[test]
    fn objects_of_one_launch_share_launch_info() {
        let mut builder = CatalogBuilder::new();
        builder.merge(&ObjectFields {
            object_id: "1998-067A",
            country_code: "ISS",
            ..fields(25544)
        });
        // second object of the same launch arrives knowing only the site
        builder.merge(&ObjectFields {
            object_id: "1998-067B",
            launch_site: "TYMSC",
            ..fields(25545)
        });
        let catalog = builder.finalize();
        let first = catalog.by_id(25544).unwrap();
        let second = catalog.by_id(25545).unwrap();
        assert_eq!(first.launch, second.launch);
        assert_eq!(first.launch.country_code.as_deref(), Some("ISS"));
        assert_eq!(first.launch.launch_site.as_deref(), Some("TYMSC"));
    }

    #[test]
    fn non_ascii_designator_yields_no_launch_info() {
        let mut builder = CatalogBuilder::new();
        // '×' spans bytes 7..9, so the 8-byte launch prefix is not a clean cut
        builder.merge(&ObjectFields {
            object_id: "1998-06×A",
            country_code: "US",
            ..fields(900)
        });
        let catalog = builder.finalize();
        let satellite = catalog.by_id(900).unwrap();
        assert_eq!(satellite.object_id.as_deref(), Some("1998-06×A"));
        assert_eq!(satellite.launch, LaunchInfo::default());
    }

    #[test]
    fn unsized_objects_default_by_class_at_finalize() {
        let mut builder = CatalogBuilder::new();
        builder.merge(&ObjectFields {
            object_class: "DEBRIS",
            ..fields(3)
        });
        builder.merge(&ObjectFields {
            object_class: "PAYLOAD",
            ..fields(4)
        });
        builder.merge(&fields(5));
        let catalog = builder.finalize();
        assert_eq!(catalog.by_id(3).unwrap().size_class, SizeClass::Small);
        assert_eq!(catalog.by_id(4).unwrap().size_class, SizeClass::Large);
        assert_eq!(catalog.by_id(5).unwrap().object_class, ObjectClass::Unknown);
        assert_eq!(catalog.by_id(5).unwrap().size_class, SizeClass::Large);
    }

    #[test]
    fn merge_is_idempotent() {
        let record = ObjectFields {
            object_id: "1990-037B",
            name: "HST",
            object_class: "PAYLOAD",
            size_class: "LARGE",
            country_code: "US",
            launch_date: "1990-04-24",
            launch_site: "AFETR",
            ..fields(20580)
        };
        let mut once = CatalogBuilder::new();
        once.merge(&record);
        let mut twice = CatalogBuilder::new();
        twice.merge(&record);
        twice.merge(&record);
        let once = once.finalize();
        let twice = twice.finalize();
        assert_eq!(once.by_id(20580).unwrap().to_row(), twice.by_id(20580).unwrap().to_row());
    }
}

//! Elevator and escalator accessibility.
//!
//! The equipment inventory and the outage lists are JSON documents. Field
//! names follow the upstream columns on the way in and readable names on the
//! way out. Missing or null text fields read as empty strings.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::gtfs::Route;

use super::error::ServiceError;
use super::AggregationService;

/// One elevator or escalator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Equipment {
    #[serde(rename(deserialize = "equipmentno"), default, deserialize_with = "text")]
    pub equipment_no: String,
    #[serde(rename(deserialize = "equipmenttype"), default, deserialize_with = "text")]
    pub equipment_type: String,
    #[serde(default, deserialize_with = "text")]
    pub serving: String,
    /// Set unless upstream `isactive` is exactly `"Y"`. Absent or null reads as set.
    #[serde(
        rename(deserialize = "isactive"),
        default = "default_active",
        deserialize_with = "not_yes_flag"
    )]
    pub is_active: bool,
    #[serde(rename(deserialize = "stationcomplexid"), default, deserialize_with = "text")]
    pub station_complex_id: String,
    #[serde(rename(deserialize = "elevatorgtfsstopid"), default, deserialize_with = "text")]
    pub gtfs_stop_id: String,
    #[serde(rename(deserialize = "station"), default, deserialize_with = "text")]
    pub station_name: String,
}

/// A current or planned equipment outage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Outage {
    /// Equipment number, matches [`Equipment::equipment_no`].
    #[serde(default, deserialize_with = "text")]
    pub equipment: String,
    #[serde(default, deserialize_with = "text")]
    pub station: String,
    #[serde(rename(deserialize = "equipmenttype"), default, deserialize_with = "text")]
    pub equipment_type: String,
    #[serde(default, deserialize_with = "text")]
    pub serving: String,
    #[serde(default, deserialize_with = "text")]
    pub reason: String,
    #[serde(rename(deserialize = "outagedate"), default, deserialize_with = "text")]
    pub outage_date: String,
    #[serde(
        rename(deserialize = "estimatedreturntoservice"),
        default,
        deserialize_with = "text"
    )]
    pub estimated_return: String,
    #[serde(rename(deserialize = "isupcomingoutage"), default, deserialize_with = "yes_flag")]
    pub is_upcoming: bool,
    #[serde(rename(deserialize = "ismaintenanceoutage"), default, deserialize_with = "yes_flag")]
    pub is_maintenance: bool,
}

/// Outage feeds come either as a bare list or wrapped in `{"outages": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum OutageDocument {
    List(Vec<Outage>),
    Wrapped { outages: Vec<Outage> },
}

impl OutageDocument {
    pub(super) fn into_outages(self) -> Vec<Outage> {
        match self {
            OutageDocument::List(outages) | OutageDocument::Wrapped { outages } => outages,
        }
    }
}

/// Accessibility data of one type, as read from upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AccessibilityData {
    Equipment(Vec<Equipment>),
    Outages(Vec<Outage>),
}

/// Equipment at a station together with its outage status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationEquipment {
    #[serde(flatten)]
    pub equipment: Equipment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<Outage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub upcoming_outages: Vec<Outage>,
}

impl StationEquipment {
    /// Join equipment to the outages carrying its equipment number. When
    /// several current outages match, the last one listed is its status.
    pub(super) fn join(equipment: &Equipment, current: &[Outage], upcoming: &[Outage]) -> Self {
        let matches = |o: &&Outage| o.equipment == equipment.equipment_no;
        Self {
            equipment: equipment.clone(),
            current_status: current.iter().rfind(matches).cloned(),
            upcoming_outages: upcoming.iter().filter(matches).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WheelchairInfo {
    pub wheelchair_boarding: String,
    pub wheelchair_accessible: bool,
}

impl WheelchairInfo {
    fn from_code(code: &str) -> Self {
        Self {
            wheelchair_boarding: code.to_string(),
            wheelchair_accessible: code == "1",
        }
    }
}

/// Accessibility of one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationAccessibility {
    pub station_id: String,
    pub equipment_count: usize,
    pub equipment: Vec<StationEquipment>,
    pub wheelchair_info: Option<WheelchairInfo>,
}

/// A station complex with elevators or escalators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibleStation {
    pub id: String,
    pub name: String,
    pub has_accessibility: bool,
    pub equipment: Vec<Equipment>,
    pub routes: Vec<Route>,
}

impl AggregationService {
    /// Equipment registered at `station_id`, with outage status.
    ///
    /// Fails when the equipment inventory can't be read. Unreadable outage
    /// feeds leave the equipment without status.
    pub async fn get_station_accessibility(
        &self,
        station_id: &str,
    ) -> Result<StationAccessibility, ServiceError> {
        let equipment = self.equipment().await?;
        let current = self.outages_or_empty("current").await;
        let upcoming = self.outages_or_empty("upcoming").await;

        let station_equipment: Vec<StationEquipment> = equipment
            .iter()
            .filter(|e| e.gtfs_stop_id == station_id)
            .map(|e| StationEquipment::join(e, &current, &upcoming))
            .collect();

        let wheelchair_info = self
            .index()
            .await
            .stop(station_id)
            .and_then(|stop| stop.wheelchair_boarding.as_deref())
            .map(WheelchairInfo::from_code);

        Ok(StationAccessibility {
            station_id: station_id.to_string(),
            equipment_count: station_equipment.len(),
            equipment: station_equipment,
            wheelchair_info,
        })
    }

    /// Station complexes with equipment, in inventory order.
    ///
    /// Each complex lists all of its equipment and the routes serving any of
    /// its GTFS stops. Rows without a complex id or station name are skipped.
    pub async fn get_accessible_stations(&self) -> Result<Vec<AccessibleStation>, ServiceError> {
        let equipment = self
            .equipment()
            .await
            .map_err(|e| e.in_context("Failed to get accessible stations"))?;
        let snapshot = self.snapshot().await;
        let route_map = match self.station_route_map_of(&snapshot).await {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Station route map unavailable");
                Default::default()
            }
        };

        let mut stations: Vec<AccessibleStation> = Vec::new();
        let mut gtfs_ids: Vec<BTreeSet<&str>> = Vec::new();
        let mut by_complex: HashMap<&str, usize> = HashMap::new();

        for item in equipment.iter() {
            let complex_id = item.station_complex_id.trim();
            let name = item.station_name.trim();
            if complex_id.is_empty() || name.is_empty() {
                continue;
            }

            let slot = *by_complex.entry(complex_id).or_insert_with(|| {
                stations.push(AccessibleStation {
                    id: complex_id.to_string(),
                    name: name.to_string(),
                    has_accessibility: true,
                    equipment: Vec::new(),
                    routes: Vec::new(),
                });
                gtfs_ids.push(BTreeSet::new());
                stations.len() - 1
            });

            stations[slot].equipment.push(item.clone());
            let gtfs_id = item.gtfs_stop_id.trim();
            if !gtfs_id.is_empty() {
                gtfs_ids[slot].insert(gtfs_id);
            }
        }

        for (station, ids) in stations.iter_mut().zip(&gtfs_ids) {
            let route_ids: BTreeSet<&str> = ids
                .iter()
                .filter_map(|id| route_map.get(*id))
                .flatten()
                .map(String::as_str)
                .collect();
            station.routes = snapshot
                .index
                .routes()
                .iter()
                .filter(|route| route_ids.contains(route.id.as_str()))
                .cloned()
                .collect();
        }

        Ok(stations)
    }
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn yes_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = Option::<String>::deserialize(deserializer)?;
    Ok(flag.is_some_and(|f| f.trim().eq_ignore_ascii_case("Y")))
}

fn not_yes_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = Option::<String>::deserialize(deserializer)?;
    Ok(flag.as_deref() != Some("Y"))
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::realtime::FetchError;
    use crate::service::testing::*;

    const EQUIPMENT_JSON: &str = r#"[
        {"equipmentno": "EL100", "equipmenttype": "EL", "serving": "Mezzanine to A/C",
         "isactive": "Y", "stationcomplexid": "123", "elevatorgtfsstopid": "A27",
         "station": "42 St-Port Authority"},
        {"equipmentno": "ES200", "equipmenttype": "ES", "serving": "Street to mezzanine",
         "isactive": "N", "stationcomplexid": "123", "elevatorgtfsstopid": "A28",
         "station": "42 St-Port Authority"},
        {"equipmentno": "EL300", "equipmenttype": "EL", "isactive": "Y",
         "stationcomplexid": "", "elevatorgtfsstopid": "A24", "station": "59 St"},
        {"equipmentno": "EL400", "equipmenttype": "EL", "isactive": "Y",
         "stationcomplexid": "456", "elevatorgtfsstopid": "A24", "station": "  "},
        {"equipmentno": "EL500", "equipmenttype": "EL", "isactive": null,
         "stationcomplexid": "789", "elevatorgtfsstopid": null, "station": "Nowhere"}
    ]"#;

    const CURRENT_JSON: &str = r#"{"outages": [
        {"equipment": "EL100", "station": "42 St-Port Authority", "reason": "Repair",
         "outagedate": "10/18/2026 06:00:00 AM", "isupcomingoutage": "N",
         "ismaintenanceoutage": "N"}
    ]}"#;

    const UPCOMING_JSON: &str = r#"[
        {"equipment": "EL100", "reason": "Capital replacement", "isupcomingoutage": "Y",
         "ismaintenanceoutage": "Y"},
        {"equipment": "ES200", "reason": "Inspection", "isupcomingoutage": "Y"}
    ]"#;

    fn fetcher() -> MockFetcher {
        MockFetcher::new()
            .serve(EQUIPMENT_URL, EQUIPMENT_JSON)
            .serve(CURRENT_URL, CURRENT_JSON)
            .serve(UPCOMING_URL, UPCOMING_JSON)
    }

    #[test]
    fn equipment_reads_upstream_columns() {
        let equipment: Vec<Equipment> = serde_json::from_str(EQUIPMENT_JSON).unwrap();
        assert_eq!(equipment.len(), 5);
        assert_eq!(equipment[0].equipment_no, "EL100");
        assert_eq!(equipment[0].gtfs_stop_id, "A27");
        assert_eq!(equipment[4].gtfs_stop_id, "");

        let json = serde_json::to_value(&equipment[0]).unwrap();
        assert_eq!(json["equipment_no"], "EL100");
        assert_eq!(json["station_complex_id"], "123");
    }

    #[test]
    fn is_active_set_unless_isactive_is_y() {
        let equipment: Vec<Equipment> = serde_json::from_str(EQUIPMENT_JSON).unwrap();
        assert!(!equipment[0].is_active);
        assert!(equipment[1].is_active);
        assert!(equipment[4].is_active);

        let missing: Equipment = serde_json::from_str(r#"{"equipmentno": "EL600"}"#).unwrap();
        assert!(missing.is_active);

        let lower: Equipment = serde_json::from_str(r#"{"isactive": "y"}"#).unwrap();
        assert!(lower.is_active);
    }

    #[test]
    fn outage_document_accepts_list_or_wrapper() {
        let wrapped: OutageDocument = serde_json::from_str(CURRENT_JSON).unwrap();
        let outages = wrapped.into_outages();
        assert_eq!(outages.len(), 1);
        assert_eq!(outages[0].outage_date, "10/18/2026 06:00:00 AM");
        assert!(!outages[0].is_upcoming);

        let list: OutageDocument = serde_json::from_str(UPCOMING_JSON).unwrap();
        let outages = list.into_outages();
        assert_eq!(outages.len(), 2);
        assert!(outages[0].is_upcoming);
        assert!(outages[0].is_maintenance);
        assert!(!outages[1].is_maintenance);
    }

    #[tokio::test]
    async fn station_accessibility_joins_outages() {
        let service = service(Arc::new(fetcher()));

        let info = service.get_station_accessibility("A27").await.unwrap();
        assert_eq!(info.equipment_count, 1);
        let el = &info.equipment[0];
        assert_eq!(el.equipment.equipment_no, "EL100");
        assert_eq!(
            el.current_status.as_ref().map(|o| o.reason.as_str()),
            Some("Repair")
        );
        assert_eq!(el.upcoming_outages.len(), 1);
        assert_eq!(
            info.wheelchair_info,
            Some(WheelchairInfo {
                wheelchair_boarding: "1".into(),
                wheelchair_accessible: true,
            })
        );

        let info = service.get_station_accessibility("A28").await.unwrap();
        assert_eq!(info.equipment[0].equipment.equipment_no, "ES200");
        assert!(info.equipment[0].current_status.is_none());
        assert!(info.wheelchair_info.is_none());
    }

    #[tokio::test]
    async fn station_accessibility_degrades_without_outages() {
        let fetcher = MockFetcher::new()
            .serve(EQUIPMENT_URL, EQUIPMENT_JSON)
            .fail(CURRENT_URL, FetchError::Status(500))
            .serve(UPCOMING_URL, "not json");
        let service = service(Arc::new(fetcher));

        let info = service.get_station_accessibility("A27").await.unwrap();
        assert_eq!(info.equipment_count, 1);
        assert!(info.equipment[0].current_status.is_none());
        assert!(info.equipment[0].upcoming_outages.is_empty());
    }

    #[tokio::test]
    async fn station_accessibility_fails_without_equipment() {
        let fetcher = MockFetcher::new().fail(EQUIPMENT_URL, FetchError::Status(502));
        let service = service(Arc::new(fetcher));

        let err = service.get_station_accessibility("A27").await.unwrap_err();
        assert_eq!(err, ServiceError::Upstream("HTTP error: 502".into()));
    }

    #[test]
    fn last_listed_current_outage_is_status() {
        let equipment: Vec<Equipment> = serde_json::from_str(EQUIPMENT_JSON).unwrap();
        let current: Vec<Outage> = serde_json::from_str(
            r#"[{"equipment": "EL100", "reason": "Repair"},
                {"equipment": "ES200", "reason": "Inspection"},
                {"equipment": "EL100", "reason": "Power failure"}]"#,
        )
        .unwrap();

        let joined = StationEquipment::join(&equipment[0], &current, &[]);
        assert_eq!(
            joined.current_status.map(|o| o.reason),
            Some("Power failure".to_string())
        );
    }

    #[tokio::test]
    async fn accessible_stations_fail_with_trace_without_equipment() {
        let fetcher = MockFetcher::new().fail(EQUIPMENT_URL, FetchError::Status(502));
        let service = service(Arc::new(fetcher));

        let err = service.get_accessible_stations().await.unwrap_err();
        let payload = err.payload();
        assert_eq!(
            payload.error,
            "Failed to get accessible stations: HTTP error: 502"
        );
        assert_eq!(payload.trace.as_deref(), Some(r#"Upstream("HTTP error: 502")"#));
    }

    #[tokio::test]
    async fn accessible_stations_group_by_complex() {
        let service = service(Arc::new(fetcher()));

        let stations = service.get_accessible_stations().await.unwrap();
        let ids: Vec<&str> = stations.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["123", "789"]);

        let complex = &stations[0];
        assert_eq!(complex.name, "42 St-Port Authority");
        assert!(complex.has_accessibility);
        assert_eq!(complex.equipment.len(), 2);
        // A27 is served by A and C, A28 by A only.
        let routes: Vec<&str> = complex.routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(routes, vec!["A", "C"]);

        assert!(stations[1].routes.is_empty());
    }
}

//! CSV readers for the reference tables.
//!
//! Public data portals publish the same tables under different headers, so
//! columns are located by a list of known aliases rather than by position.

use std::{io::Read, path::Path};

use csv::StringRecord;
use encoding_rs::EUC_KR;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{RouteStopEntry, Stop, normalize_short_code};

const STOP_NAME: &[&str] = &["정류장명", "정류소명", "stop_name", "name"];
const NODE_ID: &[&str] = &["정류장번호", "NODE_ID", "노드ID", "node_id"];
const ARS_CODE: &[&str] = &["모바일단축번호", "ARS_ID", "ARS번호", "정류소번호", "ars_id", "ars"];
const LATITUDE: &[&str] = &["위도", "Y좌표", "lat", "latitude"];
const LONGITUDE: &[&str] = &["경도", "X좌표", "lon", "longitude"];
const CITY_CODE: &[&str] = &["도시코드", "city_code", "citycode"];

const ROUTE_NAME: &[&str] = &["노선명", "노선번호", "route_name", "route"];
const ROUTE_ID: &[&str] = &["노선ID", "route_id"];
const SEQUENCE: &[&str] = &["순번", "정류소순번", "seq", "sequence"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{table} table has no {column} column")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

pub fn load_stops(path: &Path) -> Result<Vec<Stop>, LoadError> {
    info!(path = %path.display(), "loading stop table");
    let text = read_text(path)?;
    read_stops(text.as_bytes())
}

pub fn load_route_entries(path: &Path) -> Result<Vec<RouteStopEntry>, LoadError> {
    info!(path = %path.display(), "loading route table");
    let text = read_text(path)?;
    read_route_entries(text.as_bytes())
}

pub fn read_stops<R: Read>(reader: R) -> Result<Vec<Stop>, LoadError> {
    let mut rdr = reader_builder().from_reader(reader);
    let headers = rdr.headers()?.clone();

    let idx_name = column(&headers, STOP_NAME).ok_or(LoadError::MissingColumn {
        table: "stop",
        column: "stop name",
    })?;
    let idx_node = column(&headers, NODE_ID);
    let idx_ars = column(&headers, ARS_CODE);
    if idx_node.is_none() && idx_ars.is_none() {
        return Err(LoadError::MissingColumn {
            table: "stop",
            column: "stop id or ARS code",
        });
    }
    let idx_lat = column(&headers, LATITUDE);
    let idx_lon = column(&headers, LONGITUDE);
    let idx_city = column(&headers, CITY_CODE);

    let mut stops = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                debug!(line, %error, "unreadable stop row");
                skipped += 1;
                continue;
            }
        };

        let name = field(&record, Some(idx_name)).unwrap_or_default();
        let node_id = field(&record, idx_node).unwrap_or_default();
        let ars_code = field(&record, idx_ars).unwrap_or_default();
        if name.is_empty() || (node_id.is_empty() && ars_code.is_empty()) {
            skipped += 1;
            continue;
        }

        stops.push(Stop {
            short_code: normalize_short_code(&ars_code),
            name,
            ars_code,
            node_id,
            city_code: field(&record, idx_city),
            latitude: field(&record, idx_lat).and_then(|s| s.parse().ok()),
            longitude: field(&record, idx_lon).and_then(|s| s.parse().ok()),
        });
    }

    if skipped > 0 {
        warn!(skipped, "skipped stop rows without a name or id");
    }
    Ok(stops)
}

pub fn read_route_entries<R: Read>(reader: R) -> Result<Vec<RouteStopEntry>, LoadError> {
    let mut rdr = reader_builder().from_reader(reader);
    let headers = rdr.headers()?.clone();

    let idx_route = column(&headers, ROUTE_NAME).ok_or(LoadError::MissingColumn {
        table: "route",
        column: "route name",
    })?;
    let idx_seq = column(&headers, SEQUENCE).ok_or(LoadError::MissingColumn {
        table: "route",
        column: "sequence",
    })?;
    let idx_route_id = column(&headers, ROUTE_ID);
    let idx_ars = column(&headers, ARS_CODE);
    let idx_name = column(&headers, STOP_NAME);

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                debug!(line, %error, "unreadable route row");
                skipped += 1;
                continue;
            }
        };

        let Some(route_name) = field(&record, Some(idx_route)) else {
            skipped += 1;
            continue;
        };
        let Some(sequence) = field(&record, Some(idx_seq)).and_then(|s| parse_sequence(&s)) else {
            skipped += 1;
            continue;
        };
        let short_code = field(&record, idx_ars)
            .map(|code| normalize_short_code(&code))
            .unwrap_or_default();
        let stop_name = field(&record, idx_name).unwrap_or_default();
        if short_code.is_empty() && stop_name.is_empty() {
            skipped += 1;
            continue;
        }

        entries.push(RouteStopEntry {
            route_name,
            route_id: field(&record, idx_route_id),
            sequence,
            short_code,
            stop_name,
        });
    }

    if skipped > 0 {
        warn!(skipped, "skipped malformed route rows");
    }
    Ok(entries)
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.flexible(true).trim(csv::Trim::All);
    builder
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path)?;
    Ok(decode_table(bytes))
}

/// The data portals publish most tables in CP949; UTF-8 is tried first and
/// anything that is not valid UTF-8 is decoded as CP949.
fn decode_table(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => {
            let (text, _, had_errors) = EUC_KR.decode(error.as_bytes());
            if had_errors {
                warn!("table is neither UTF-8 nor CP949, undecodable bytes were replaced");
            } else {
                debug!("decoded table as CP949");
            }
            text.into_owned()
        }
    };
    text.trim_start_matches('\u{feff}').to_string()
}

fn column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.trim().trim_start_matches('\u{feff}');
        aliases.iter().any(|alias| header.eq_ignore_ascii_case(alias))
    })
}

fn field(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Some exports write sequence numbers as floats (`"12.0"`).
fn parse_sequence(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_national_stop_table() {
        let csv = "정류장번호,정류장명,위도,경도,정보수집일,모바일단축번호,도시코드,도시명\n\
                   DJB8001793,대전역,36.3323,127.4342,2025-10-31,11100,25,대전광역시\n\
                   GGB204000001,판교역,37.3948,127.1112,2025-10-31,,31,성남시\n";
        let stops = read_stops(csv.as_bytes()).unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].name, "대전역");
        assert_eq!(stops[0].node_id, "DJB8001793");
        assert_eq!(stops[0].short_code, "11100");
        assert_eq!(stops[0].city_code.as_deref(), Some("25"));
        assert_eq!(stops[0].latitude, Some(36.3323));
        assert_eq!(stops[1].city_code.as_deref(), Some("31"));
        assert_eq!(stops[1].ars_code, "");
        assert_eq!(stops[1].short_code, "");
    }

    #[test]
    fn test_read_seoul_stop_table() {
        let csv = "NODE_ID,ARS_ID,정류소명,X좌표,Y좌표\n\
                   100000001,01001,종로2가사거리,126.98775,37.569765\n";
        let stops = read_stops(csv.as_bytes()).unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].ars_code, "01001");
        assert_eq!(stops[0].short_code, "1001");
        assert_eq!(stops[0].longitude, Some(126.98775));
        assert_eq!(stops[0].city_code, None);
    }

    #[test]
    fn test_cp949_table_is_decoded() {
        let csv = "정류장번호,정류장명,모바일단축번호,도시코드\nDJB8001793,대전역,11100,25\n";
        let (bytes, _, had_errors) = EUC_KR.encode(csv);
        assert!(!had_errors);
        assert!(std::str::from_utf8(&bytes).is_err());

        let text = decode_table(bytes.into_owned());
        let stops = read_stops(text.as_bytes()).unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].name, "대전역");
        assert_eq!(stops[0].node_id, "DJB8001793");
        assert_eq!(stops[0].city_code.as_deref(), Some("25"));
    }

    #[test]
    fn test_cp949_file_loads_into_index() {
        let csv = "정류장번호,정류장명,모바일단축번호\nDJB8001793,대전역,11100\n";
        let (bytes, _, _) = EUC_KR.encode(csv);
        let path = std::env::temp_dir().join(format!("busram-cp949-{}.csv", std::process::id()));
        std::fs::write(&path, &bytes).unwrap();

        let stops = load_stops(&path);
        std::fs::remove_file(&path).unwrap();
        let stops = stops.unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].short_code, "11100");
    }

    #[test]
    fn test_utf8_table_with_bom() {
        let text = decode_table("\u{feff}정류장명,ARS\n시청,01002\n".as_bytes().to_vec());
        assert!(text.starts_with("정류장명"));
    }

    #[test]
    fn test_malformed_stop_rows_are_skipped() {
        let csv = "stop_name,ars_id,lat\n\
                   ,12345,37.1\n\
                   Market,,not-a-number\n\
                   Harbor,23456,north\n\
                   Depot,34567,37.5,extra,columns\n";
        let stops = read_stops(csv.as_bytes()).unwrap();
        let names: Vec<_> = stops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Harbor", "Depot"]);
        assert_eq!(stops[0].latitude, None);
        assert_eq!(stops[1].latitude, Some(37.5));
    }

    #[test]
    fn test_stop_table_without_name_column() {
        let csv = "id,lat,lon\n1,2,3\n";
        let error = read_stops(csv.as_bytes()).unwrap_err();
        assert!(matches!(error, LoadError::MissingColumn { table: "stop", .. }));
    }

    #[test]
    fn test_read_route_table() {
        let csv = "노선ID,노선명,순번,NODE_ID,ARS_ID,정류소명\n\
                   100100118,100,2,111000128,10002,B\n\
                   100100118,100,1,111000127,10001,A\n\
                   100100118,100,x,111000129,10003,bad\n\
                   100100118,100,3.0,111000130,10004,C\n";
        let entries = read_route_entries(csv.as_bytes()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].route_id.as_deref(), Some("100100118"));
        assert_eq!(entries[0].sequence, 2);
        assert_eq!(entries[1].short_code, "10001");
        assert_eq!(entries[2].sequence, 3);
        assert_eq!(entries[2].stop_name, "C");
    }

    #[test]
    fn test_route_table_requires_sequence() {
        let csv = "route_name,stop_name\n100,A\n";
        let error = read_route_entries(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            error,
            LoadError::MissingColumn {
                column: "sequence",
                ..
            }
        ));
    }

    #[test]
    fn test_header_aliases_ignore_bom_and_case() {
        let csv = "\u{feff}Stop_Name,ARS\nHarbor,00042\n";
        let stops = read_stops(csv.as_bytes()).unwrap();
        assert_eq!(stops[0].short_code, "42");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("7"), Some(7));
        assert_eq!(parse_sequence("7.0"), Some(7));
        assert_eq!(parse_sequence("7.5"), None);
        assert_eq!(parse_sequence("-1"), None);
        assert_eq!(parse_sequence(""), None);
    }
}

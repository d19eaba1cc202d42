use anyhow::anyhow;

use crate::lookup::Stop;

#[derive(Debug)]
pub struct OsmCoords {
    pub latitude: f64,
    pub longitude: f64,
}

impl OsmCoords {
    pub fn url(self) -> String {
        let OsmCoords {
            latitude,
            longitude,
        } = self;

        format!("https://www.openstreetmap.org/?mlat={latitude}&mlon={longitude}&zoom=17")
    }
}

impl TryFrom<&Stop> for OsmCoords {
    type Error = anyhow::Error;

    /// Some stop tables carry projected (TM) coordinates instead of WGS84;
    /// those fall outside the valid ranges and are rejected.
    fn try_from(stop: &Stop) -> anyhow::Result<Self> {
        let (Some(latitude), Some(longitude)) = (stop.latitude, stop.longitude) else {
            return Err(anyhow!("{}: no coordinates", stop.name));
        };

        if !((-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)) {
            return Err(anyhow!(
                "{}: coordinates ({latitude}, {longitude}) are outside valid WGS84 ranges",
                stop.name
            ));
        }

        Ok(OsmCoords {
            latitude,
            longitude,
        })
    }
}

#[test]
fn test_stop_coords_to_osm_link() {
    let mut stop = Stop {
        name: "종로2가사거리".into(),
        ars_code: "01001".into(),
        node_id: "100000001".into(),
        city_code: None,
        latitude: Some(37.569765),
        longitude: Some(126.98775),
        short_code: "1001".into(),
    };

    let link = OsmCoords::try_from(&stop).map(OsmCoords::url);
    assert_eq!(
        link.unwrap(),
        "https://www.openstreetmap.org/?mlat=37.569765&mlon=126.98775&zoom=17"
    );

    // projected coordinates, not WGS84
    stop.latitude = Some(451_958.0);
    stop.longitude = Some(198_253.0);
    assert!(OsmCoords::try_from(&stop).is_err());

    stop.latitude = None;
    assert!(OsmCoords::try_from(&stop).is_err());
}

//! Row layouts of the CSV files that are read and written.

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StopEventRecord {
    #[serde(rename = "BETRIEBSTAG")]
    pub operating_day: String,
    #[serde(rename = "FAHRT_BEZEICHNER")]
    pub run_id: String,
    #[serde(rename = "PRODUKT_ID")]
    pub product: Option<String>,
    #[serde(rename = "LINIEN_TEXT")]
    pub line_text: Option<String>,
    #[serde(rename = "BPUIC")]
    pub station_id: u32,
    #[serde(rename = "HALTESTELLEN_NAME")]
    pub station_name: Option<String>,
    #[serde(rename = "ANKUNFTSZEIT")]
    pub arrival: Option<String>,
    #[serde(rename = "ABFAHRTSZEIT")]
    pub departure: Option<String>,
    #[serde(rename = "FAELLT_AUS_TF")]
    pub cancelled: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ServicePointRecord {
    pub number: u32,
    #[serde(rename = "designationOfficial")]
    pub name: String,
    #[serde(rename = "cantonName")]
    pub canton: Option<String>,
    #[serde(rename = "municipalityName")]
    pub municipality: Option<String>,
    #[serde(rename = "businessOrganisationDescriptionEn")]
    pub company: Option<String>,
    #[serde(rename = "wgs84East")]
    pub longitude: Option<f64>,
    #[serde(rename = "wgs84North")]
    pub latitude: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RidershipRecord {
    #[serde(rename = "UIC")]
    pub station_id: u32,
    #[serde(rename = "Jahr_Annee_Anno")]
    pub year: i32,
    #[serde(rename = "DTV_TJM_TGM")]
    pub daily: String,
    #[serde(rename = "DWV_TMJO_TFM")]
    pub weekdays: String,
    #[serde(rename = "DNWV_TMJNO_TMGNL")]
    pub weekends: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LinePointRecord {
    #[serde(rename = "Linie")]
    pub line: u32,
    #[serde(rename = "KM")]
    pub km: String,
    #[serde(rename = "BPUIC")]
    pub station_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NodeRow {
    #[serde(rename = "BPUIC")]
    pub station_id: u32,
    #[serde(rename = "STATION_NAME")]
    pub name: String,
    #[serde(rename = "CANTON")]
    pub canton: Option<String>,
    #[serde(rename = "MUNICIPALITY")]
    pub municipality: Option<String>,
    #[serde(rename = "COMPANY")]
    pub company: Option<String>,
    #[serde(rename = "LONGITUDE")]
    pub longitude: f64,
    #[serde(rename = "LATITUDE")]
    pub latitude: f64,
    #[serde(rename = "ELEVATION")]
    pub elevation: Option<f64>,
    #[serde(rename = "AVG_DAILY_TRAFFIC")]
    pub daily_traffic: Option<u32>,
    #[serde(rename = "AVG_DAILY_TRAFFIC_WEEKDAYS")]
    pub weekday_traffic: Option<u32>,
    #[serde(rename = "AVG_DAILY_TRAFFIC_WEEKENDS")]
    pub weekend_traffic: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StopEdgeRow {
    #[serde(rename = "BPUIC1")]
    pub station1: u32,
    #[serde(rename = "BPUIC2")]
    pub station2: u32,
    #[serde(rename = "NUM_CONNECTIONS")]
    pub connections: u32,
    #[serde(rename = "AVG_DURATION")]
    pub average_duration: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TopologyEdgeRow {
    #[serde(rename = "BPUIC1")]
    pub station1: u32,
    #[serde(rename = "BPUIC2")]
    pub station2: u32,
    #[serde(rename = "DISTANCE_GEODESIC")]
    pub geodesic_km: f64,
    #[serde(rename = "DISTANCE_EXACT")]
    pub exact_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TemporalEdgeRow {
    #[serde(rename = "BPUIC1")]
    pub station1: u32,
    #[serde(rename = "BPUIC2")]
    pub station2: u32,
    #[serde(rename = "START")]
    pub start: i64,
    #[serde(rename = "DURATION")]
    pub duration: i64,
}

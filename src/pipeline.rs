//! One city query: bounding box, WFS request, extraction and summary.

use tracing::info;

use crate::config::{ReferenceData, Settings};
use crate::error::QueryError;
use crate::fetch::{HttpClient, fetch_feed};
use crate::geo::{WfsQuery, compute_bounding_box};
use crate::parser::extract_records;
use crate::record::TransactionRecord;
use crate::report::CityReport;

/// Builds the WFS request URL for `city`.
///
/// # Errors
///
/// [`QueryError::UnknownCity`] for a city missing from `reference`, and
/// [`QueryError::InvalidServiceUrl`] if `settings.wfs_url` cannot be parsed.
pub fn city_request_url(
    settings: &Settings,
    reference: &ReferenceData,
    city: &str,
) -> Result<String, QueryError> {
    let bbox = compute_bounding_box(reference, city, settings.radius_km)?;
    let url = WfsQuery::new(bbox, settings.max_records)
        .url(&settings.wfs_url)
        .map_err(|e| QueryError::InvalidServiceUrl {
            url: settings.wfs_url.clone(),
            reason: e.to_string(),
        })?;
    Ok(url.into())
}

/// Fetches and extracts the transactions for `city`.
///
/// Fetch and parse failures yield an empty list; only configuration errors
/// are returned.
#[tracing::instrument(skip(client, settings, reference))]
pub async fn fetch_transactions<C: HttpClient>(
    client: &C,
    settings: &Settings,
    reference: &ReferenceData,
    city: &str,
) -> Result<Vec<TransactionRecord>, QueryError> {
    let url = city_request_url(settings, reference, city)?;
    info!(url = %url, "Querying RCN WFS");

    let bytes = fetch_feed(client, &url).await;
    let transactions = extract_records(&bytes);

    info!(
        bytes = bytes.len(),
        transactions = transactions.len(),
        "City transactions extracted"
    );
    Ok(transactions)
}

/// Runs the whole query for `city` and assembles the report.
pub async fn fetch_city<C: HttpClient>(
    client: &C,
    settings: &Settings,
    reference: &ReferenceData,
    city: &str,
) -> Result<CityReport, QueryError> {
    let transactions = fetch_transactions(client, settings, reference, city).await?;
    Ok(CityReport::new(city, transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubClient;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:ms="http://mapserver.gis.umn.edu/mapserver" xmlns:gml="http://www.opengis.net/gml/3.2">
  <wfs:member>
    <ms:lokale gml:id="lokale.1">
      <ms:lok_adres>MSC:Gdańsk;UL:Długa;NR_PORZ:12</ms:lok_adres>
      <ms:lok_pow_uzyt>50</ms:lok_pow_uzyt>
      <ms:lok_cena_brutto>500000</ms:lok_cena_brutto>
      <ms:lok_funkcja>mieszkalna</ms:lok_funkcja>
      <ms:dok_data>2022-06-01</ms:dok_data>
    </ms:lokale>
  </wfs:member>
</wfs:FeatureCollection>"#;

    #[test]
    fn test_request_url_for_known_city() {
        let settings = Settings::default();
        let url = city_request_url(&settings, &ReferenceData::builtin(), "Gdańsk").unwrap();

        assert!(url.starts_with("https://mapy.geoportal.gov.pl/wss/service/rcn?service=WFS"));
        assert!(url.contains("count=500"));
        assert!(url.contains("EPSG%3A4326"));
    }

    #[test]
    fn test_request_url_errors() {
        let reference = ReferenceData::builtin();
        let settings = Settings::default();
        assert_eq!(
            city_request_url(&settings, &reference, "Atlantis").unwrap_err(),
            QueryError::UnknownCity("Atlantis".to_string())
        );

        let settings = Settings {
            wfs_url: "::nope".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            city_request_url(&settings, &reference, "Gdańsk"),
            Err(QueryError::InvalidServiceUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_city_end_to_end() {
        let client = StubClient::new(200, FEED.as_bytes());
        let report = fetch_city(
            &client,
            &Settings::default(),
            &ReferenceData::builtin(),
            "Gdańsk",
        )
        .await
        .unwrap();

        assert_eq!(client.requests().len(), 1);
        assert_eq!(report.city, "Gdańsk");
        assert_eq!(report.count, 1);
        assert_eq!(report.transactions[0].address, "Długa 12");
        assert_eq!(report.stats.unwrap().avg, 10000);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_empty_report() {
        let client = StubClient::new(502, b"Bad Gateway");
        let report = fetch_city(
            &client,
            &Settings::default(),
            &ReferenceData::builtin(),
            "Sopot",
        )
        .await
        .unwrap();

        assert_eq!(report.count, 0);
        assert!(report.transactions.is_empty());
        assert!(report.stats.is_none());
    }

    #[tokio::test]
    async fn test_unknown_city_makes_no_request() {
        let client = StubClient::new(200, FEED.as_bytes());
        let err = fetch_city(
            &client,
            &Settings::default(),
            &ReferenceData::builtin(),
            "Berlin",
        )
        .await
        .unwrap_err();

        assert_eq!(err, QueryError::UnknownCity("Berlin".to_string()));
        assert!(client.requests().is_empty());
    }
}

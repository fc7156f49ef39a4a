use airspace_shared::layers::{FetchCommand, LayerFetchError};
use airspace_shared::models::FeatureCollection;
use dioxus::logger::tracing;

/// Absolute URL for a fetch command against the given origin.
pub fn areas_url(origin: &str, command: &FetchCommand) -> String {
    format!("{}{}", origin.trim_end_matches('/'), command.path())
}

fn api_origin() -> String {
    // Same origin as the page; the backend hosts the built frontend.
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default()
}

/// Decode an area response body. An empty body is a malformed response, not an empty layer.
pub fn decode_areas(body: &str) -> Result<FeatureCollection, LayerFetchError> {
    serde_json::from_str(body).map_err(|e| LayerFetchError::Decode(e.to_string()))
}

/// Run one layer fetch. Every failure comes back as a `LayerFetchError`; nothing is retried.
pub async fn fetch_areas(command: &FetchCommand) -> Result<FeatureCollection, LayerFetchError> {
    let url = areas_url(&api_origin(), command);
    tracing::debug!(layer = %command.layer, generation = command.generation, "fetching {}", url);

    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|e| LayerFetchError::Network(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(LayerFetchError::Status(status.as_u16()));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| LayerFetchError::Network(e.to_string()))?;
    decode_areas(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use airspace_shared::bounds::QueryBounds;
    use airspace_shared::geo::{LatLng, LatLngBounds};
    use airspace_shared::layers::LayerId;
    use airspace_shared::models::AREA_NAME_PROPERTY;

    fn command(layer: LayerId) -> FetchCommand {
        FetchCommand {
            layer,
            generation: 1,
            bounds: QueryBounds::from_lat_lng_bounds(&LatLngBounds::new(
                LatLng::new(35.75, 139.8),
                LatLng::new(35.5, 139.5),
            )),
        }
    }

    #[test]
    fn test_areas_url_did() {
        assert_eq!(
            areas_url("http://localhost:8081", &command(LayerId::Did)),
            "http://localhost:8081/api/did_areas?bounds=35.75,139.8,35.5,139.8,35.5,139.5,35.75,139.5"
        );
    }

    #[test]
    fn test_areas_url_airport_trailing_slash() {
        assert_eq!(
            areas_url("https://areas.example.com/", &command(LayerId::Airport)),
            "https://areas.example.com/api/airport_areas?bounds=35.75,139.8,35.5,139.8,35.5,139.5,35.75,139.5"
        );
    }

    #[test]
    fn test_decode_areas_response() {
        let body = r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[139.7,35.6],[139.8,35.6],[139.8,35.7],[139.7,35.6]]]},"properties":{"area_id":"13101","area_name":"千代田区"}}]}"#;
        let fc = decode_areas(body).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert_eq!(
            fc.features[0].property_text(AREA_NAME_PROPERTY).as_deref(),
            Some("千代田区")
        );
    }

    #[test]
    fn test_decode_empty_collection() {
        let fc = decode_areas(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(fc.is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        assert!(matches!(
            decode_areas("<html>502 Bad Gateway</html>"),
            Err(LayerFetchError::Decode(_))
        ));
        assert!(matches!(decode_areas(""), Err(LayerFetchError::Decode(_))));
    }
}

/*!
Mock geocoder pour tester la recherche sans service Nominatim

Renvoie une réponse scriptée et enregistre chaque requête reçue.
*/

use futures::future::BoxFuture;
use futures::FutureExt;
use hazardlite_core::{GeoPoint, GeocodeQuery, GeocodeResponse, Geocoder, ResolutionError};
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Script {
    Found { lat: f64, lon: f64, label: String },
    Empty,
    Failing(String),
}

pub struct MockGeocoder {
    script: Script,
    delay: Option<Duration>,
    queries: Mutex<Vec<GeocodeQuery>>,
}

impl MockGeocoder {
    fn scripted(script: Script) -> Self {
        Self { script, delay: None, queries: Mutex::new(Vec::new()) }
    }

    /// Un candidat unique à la position donnée
    pub fn found(lat: f64, lon: f64, label: &str) -> Self {
        Self::scripted(Script::Found { lat, lon, label: label.to_string() })
    }

    /// Réponse vide (aucun candidat)
    pub fn empty() -> Self {
        Self::scripted(Script::Empty)
    }

    /// Échec transport
    pub fn failing(reason: &str) -> Self {
        Self::scripted(Script::Failing(reason.to_string()))
    }

    /// Retarde la réponse (simulation d'une recherche lente)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn queries(&self) -> Vec<GeocodeQuery> {
        self.queries.lock().clone()
    }

    fn answer(&self) -> Result<GeocodeResponse, ResolutionError> {
        match &self.script {
            Script::Found { lat, lon, label } => {
                let point = GeoPoint::new(*lat, *lon).map_err(|e| ResolutionError::NetworkError(e.to_string()))?;
                Ok(GeocodeResponse::CandidateFound { point, label: label.clone() })
            }
            Script::Empty => Ok(GeocodeResponse::NoCandidates),
            Script::Failing(reason) => Err(ResolutionError::NetworkError(reason.clone())),
        }
    }
}

impl Geocoder for MockGeocoder {
    fn search<'a>(
        &'a self,
        query: &'a GeocodeQuery,
    ) -> BoxFuture<'a, Result<GeocodeResponse, ResolutionError>> {
        self.queries.lock().push(query.clone());
        log::info!("🔎 [MOCK] geocode '{}' ({})", query.text, query.country_code);

        async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer()
        }
        .boxed()
    }
}

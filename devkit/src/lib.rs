/*!
# HazardLite DevKit - Stubs et utilitaires de test

Bibliothèque facilitant les tests des composants HazardLite avec :
- Géocodeur scripté (réponse fixe, aucun résultat, erreur réseau)
- Positionnement scripté (position fixe, refus, plateforme non supportée)
- Origine d'assets en mémoire avec compteur d'appels et mode hors-ligne
- Harness assemblant évaluateur, résolveur et cache autour de ces stubs
*/

pub mod geocoder_stub;
pub mod origin_stub;
pub mod position_stub;
pub mod test_utils;

pub use geocoder_stub::MockGeocoder;
pub use origin_stub::MockOrigin;
pub use position_stub::MockPositioning;
pub use test_utils::TestHarness;

#![no_main]

use cycif_db::headers::{classify, HeaderKey, HeaderNormalizer};
use cycif_db::markers::MarkerRegistry;
use libfuzzer_sys::fuzz_target;

const REGISTRY: &str = "\
kind\tid\tname\tfluor\tanti\tduplicate\taliases
marker\t56\tCD45\t\t\t\tCD45_1
marker\t105\tDAPI\t\t\t\tDAPI_1
other\t\tarea\t\t\t\tArea
";

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a registry file: must load or fail, never panic
    let _ = MarkerRegistry::from_reader(data);

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Every line as a header
    let headers: Vec<&str> = text.lines().collect();
    let _ = classify(&headers);

    if let Ok(registry) = MarkerRegistry::from_reader(REGISTRY.as_bytes()) {
        let normalizer = HeaderNormalizer::new(&registry);
        for header in &headers {
            let _ = normalizer.normalize(header);
        }
    }

    let _ = text.parse::<HeaderKey>();
});

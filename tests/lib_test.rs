use zonewatch::registry::RegistryError;
use zonewatch::Error;

#[test]
fn test_error_display() {
    let err = Error::Config("test error".to_string());
    assert_eq!(format!("{}", err), "Configuration error: test error");
}

#[test]
fn test_module_errors_convert() {
    let err: Error = RegistryError::ZoneAlreadyExists("a".to_string()).into();
    assert!(matches!(err, Error::Registry(_)));
    assert!(err.to_string().starts_with("Registry error:"));
}

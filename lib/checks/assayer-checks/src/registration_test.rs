use std::collections::BTreeSet;

use assayer_ports::registrations;

#[test]
fn builtin_validators_register_themselves() {
    let registered: BTreeSet<String> = registrations()
        .map(|registration| registration.build().name().to_string())
        .collect();
    let builtin: BTreeSet<String> = crate::builtin()
        .iter()
        .map(|validator| validator.name().to_string())
        .collect();

    assert_eq!(builtin.len(), 3);
    assert!(builtin.is_subset(&registered));
}

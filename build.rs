fn main() {
    println!("cargo:rerun-if-env-changed=CIRCPUMP_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=CIRCPUMP_WIFI_PASS");
    println!("cargo:rerun-if-env-changed=CIRCPUMP_MQTT_URL");

    // Only the ESP-IDF build needs the sysenv passthrough; host test builds
    // compile without the toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}

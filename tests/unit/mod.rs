mod test_classification;
mod test_config_secrecy;

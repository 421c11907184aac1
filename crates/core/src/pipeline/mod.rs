pub mod extract_features_use_case;
pub mod extraction_logger;
pub mod frame_assembler;
pub mod frame_feature_record;
pub mod frame_mapper;
pub mod infrastructure;

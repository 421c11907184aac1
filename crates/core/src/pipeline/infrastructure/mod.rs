pub mod threaded_frame_mapper;

pub mod local_file_storage;

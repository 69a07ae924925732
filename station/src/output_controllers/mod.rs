pub mod report_output_controller;

pub mod bmp280_input_controller;

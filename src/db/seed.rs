//! Sample rows for the SQL tutor, inserted once at first run.

pub struct DepartmentSeed {
    pub id: i64,
    pub name: &'static str,
    pub location: &'static str,
    pub budget: f64,
}

pub struct EmployeeSeed {
    pub id: i64,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
    pub department: &'static str,
    pub salary: f64,
    pub hire_date: &'static str,
    pub manager_id: Option<i64>,
}

pub struct SaleSeed {
    pub id: i64,
    pub employee_id: i64,
    pub product: &'static str,
    pub amount: f64,
    pub date: &'static str,
    pub customer: &'static str,
}

pub const DEPARTMENTS: [DepartmentSeed; 5] = [
    DepartmentSeed { id: 1, name: "Engineering", location: "New York", budget: 2_000_000.0 },
    DepartmentSeed { id: 2, name: "Marketing", location: "Los Angeles", budget: 800_000.0 },
    DepartmentSeed { id: 3, name: "Sales", location: "Chicago", budget: 1_200_000.0 },
    DepartmentSeed { id: 4, name: "HR", location: "New York", budget: 600_000.0 },
    DepartmentSeed { id: 5, name: "Finance", location: "Boston", budget: 900_000.0 },
];

pub const EMPLOYEES: [EmployeeSeed; 8] = [
    EmployeeSeed { id: 1, first_name: "John", last_name: "Doe", email: "john.doe@company.com", department: "Engineering", salary: 95_000.0, hire_date: "2020-01-15", manager_id: None },
    EmployeeSeed { id: 2, first_name: "Jane", last_name: "Smith", email: "jane.smith@company.com", department: "Engineering", salary: 105_000.0, hire_date: "2019-03-20", manager_id: Some(1) },
    EmployeeSeed { id: 3, first_name: "Mike", last_name: "Johnson", email: "mike.johnson@company.com", department: "Marketing", salary: 75_000.0, hire_date: "2021-06-10", manager_id: None },
    EmployeeSeed { id: 4, first_name: "Sarah", last_name: "Williams", email: "sarah.williams@company.com", department: "Sales", salary: 80_000.0, hire_date: "2020-11-05", manager_id: None },
    EmployeeSeed { id: 5, first_name: "David", last_name: "Brown", email: "david.brown@company.com", department: "HR", salary: 70_000.0, hire_date: "2022-02-14", manager_id: None },
    EmployeeSeed { id: 6, first_name: "Lisa", last_name: "Davis", email: "lisa.davis@company.com", department: "Finance", salary: 85_000.0, hire_date: "2021-09-30", manager_id: None },
    EmployeeSeed { id: 7, first_name: "Tom", last_name: "Wilson", email: "tom.wilson@company.com", department: "Engineering", salary: 92_000.0, hire_date: "2020-07-22", manager_id: Some(2) },
    EmployeeSeed { id: 8, first_name: "Emma", last_name: "Garcia", email: "emma.garcia@company.com", department: "Marketing", salary: 68_000.0, hire_date: "2022-01-18", manager_id: Some(3) },
];

pub const SALES: [SaleSeed; 7] = [
    SaleSeed { id: 1, employee_id: 2, product: "Software License", amount: 15_000.0, date: "2023-01-15", customer: "TechCorp Inc" },
    SaleSeed { id: 2, employee_id: 4, product: "Consulting Service", amount: 25_000.0, date: "2023-02-20", customer: "StartupXYZ" },
    SaleSeed { id: 3, employee_id: 4, product: "Training Package", amount: 8_000.0, date: "2023-03-10", customer: "BigCompany Ltd" },
    SaleSeed { id: 4, employee_id: 2, product: "Custom Development", amount: 35_000.0, date: "2023-03-25", customer: "Enterprise Solutions" },
    SaleSeed { id: 5, employee_id: 4, product: "Support Contract", amount: 12_000.0, date: "2023-04-05", customer: "Local Business" },
    SaleSeed { id: 6, employee_id: 2, product: "Software License", amount: 18_000.0, date: "2023-04-18", customer: "Government Agency" },
    SaleSeed { id: 7, employee_id: 4, product: "Consulting Service", amount: 22_000.0, date: "2023-05-02", customer: "NonProfit Org" },
];
